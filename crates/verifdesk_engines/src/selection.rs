#![forbid(unsafe_code)]

use log::info;
use rand::seq::SliceRandom;
use rand::Rng;
use verifdesk_kernel_contracts::case::{AuditCase, AuditCaseId, CaseMetadata};
use verifdesk_kernel_contracts::quarter::Quarter;
use verifdesk_kernel_contracts::roster::User;
use verifdesk_kernel_contracts::selection::{
    SelectionCandidate, SelectionOrigin, SelectionResult, PREVIOUS_QUARTER_RANDOM_COUNT,
};
use verifdesk_kernel_contracts::ContractViolation;

use crate::access::coverage_limit;

/// Prefix of every case id minted by auto-selection.
pub const AUTO_SELECTION_ID_PREFIX: &str = "AS";

const PRODUCT_LINES: [&str; 4] = ["LIFE", "PROPERTY", "LIABILITY", "HEALTH"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionConfig {
    pub user_amount_floor: u64,
    pub user_amount_ratio_percent: u64,
    pub random_amount_min: u64,
    pub random_amount_max: u64,
}

impl SelectionConfig {
    pub fn mvp_v1() -> Self {
        Self {
            user_amount_floor: 1_000,
            user_amount_ratio_percent: 80,
            random_amount_min: 5_000,
            random_amount_max: 105_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AutoSelection {
    config: SelectionConfig,
}

impl AutoSelection {
    pub fn new(config: SelectionConfig) -> Result<Self, ContractViolation> {
        if config.user_amount_ratio_percent == 0 || config.user_amount_ratio_percent > 100 {
            return Err(ContractViolation::InvalidRange {
                field: "selection_config.user_amount_ratio_percent",
                min: 1,
                max: 100,
                got: config.user_amount_ratio_percent,
            });
        }
        if config.random_amount_min > config.random_amount_max {
            return Err(ContractViolation::InvalidValue {
                field: "selection_config.random_amount_min",
                reason: "must be <= random_amount_max",
            });
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> SelectionConfig {
        self.config
    }

    /// Builds a fresh candidate set: one case per eligible user, then the
    /// previous-quarter filler. `prior_cases` only lends metadata to the filler
    /// and may be empty.
    pub fn run<R: Rng + ?Sized>(
        &self,
        roster: &[User],
        prior_cases: &[AuditCase],
        quarter: Quarter,
        rng: &mut R,
    ) -> Result<SelectionResult, ContractViolation> {
        let quarter_key = quarter.key();
        let eligible: Vec<&User> = roster.iter().filter(|u| u.is_selection_eligible()).collect();
        let mut candidates = Vec::with_capacity(eligible.len() + PREVIOUS_QUARTER_RANDOM_COUNT);

        for user in &eligible {
            let seq = candidates.len() + 1;
            let case = AuditCase::v1(
                candidate_id(quarter, seq)?,
                Some(user.id.clone()),
                self.user_amount(user, rng),
                quarter_key.clone(),
                synthetic_metadata(rng),
            )?;
            candidates.push(SelectionCandidate {
                case,
                origin: SelectionOrigin::CurrentQuarterUser,
            });
        }

        for _ in 0..PREVIOUS_QUARTER_RANDOM_COUNT {
            let seq = candidates.len() + 1;
            let metadata = match prior_cases.choose(rng) {
                Some(prior) => prior.metadata.clone(),
                None => synthetic_metadata(rng),
            };
            let amount =
                rng.gen_range(self.config.random_amount_min..=self.config.random_amount_max);
            let case = AuditCase::v1(
                candidate_id(quarter, seq)?,
                None,
                amount,
                quarter_key.clone(),
                metadata,
            )?;
            candidates.push(SelectionCandidate {
                case,
                origin: SelectionOrigin::PreviousQuarterRandom,
            });
        }

        info!(
            "auto-selection {}: {} user candidates, {} random candidates ({} prior cases available)",
            quarter_key,
            eligible.len(),
            PREVIOUS_QUARTER_RANDOM_COUNT,
            prior_cases.len()
        );
        SelectionResult::v1(quarter_key, candidates)
    }

    /// Uniform in `[floor, ratio% of the role limit)`; collapses to `floor` when
    /// the role bound leaves no room.
    fn user_amount<R: Rng + ?Sized>(&self, user: &User, rng: &mut R) -> u64 {
        let upper = coverage_limit(user.role) * self.config.user_amount_ratio_percent / 100;
        if upper <= self.config.user_amount_floor {
            return self.config.user_amount_floor;
        }
        rng.gen_range(self.config.user_amount_floor..upper)
    }
}

fn candidate_id(quarter: Quarter, seq: usize) -> Result<AuditCaseId, ContractViolation> {
    AuditCaseId::new(format!(
        "{AUTO_SELECTION_ID_PREFIX}-{}-{seq:03}",
        quarter.key()
    ))
}

fn synthetic_metadata<R: Rng + ?Sized>(rng: &mut R) -> CaseMetadata {
    CaseMetadata {
        client_name: format!("Client {:04}", rng.gen_range(0..10_000)),
        policy_number: format!("POL-{:06}", rng.gen_range(0..1_000_000)),
        product_line: PRODUCT_LINES.choose(rng).map(|p| (*p).to_string()),
    }
}
