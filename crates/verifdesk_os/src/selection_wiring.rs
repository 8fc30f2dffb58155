#![forbid(unsafe_code)]

use log::warn;
use rand::Rng;
use verifdesk_engines::quarter::previous_quarter_key;
use verifdesk_engines::selection::{AutoSelection, SelectionConfig};
use verifdesk_kernel_contracts::case::AuditCase;
use verifdesk_kernel_contracts::quarter::Quarter;
use verifdesk_kernel_contracts::roster::User;
use verifdesk_kernel_contracts::selection::SelectionResult;
use verifdesk_kernel_contracts::ContractViolation;

use crate::ports::{decode_case_list, CaseSource};

/// Auto-selection fed by the previous quarter's cases.
///
/// A failed prior-quarter fetch never fails the run: it is logged and the
/// filler candidates fall back to synthetic metadata.
#[derive(Debug, Clone)]
pub struct SelectionWiring<C>
where
    C: CaseSource,
{
    engine: AutoSelection,
    source: C,
}

impl<C> SelectionWiring<C>
where
    C: CaseSource,
{
    pub fn new(config: SelectionConfig, source: C) -> Result<Self, ContractViolation> {
        Ok(Self {
            engine: AutoSelection::new(config)?,
            source,
        })
    }

    pub fn prior_quarter_cases(&self, quarter: Quarter) -> Vec<AuditCase> {
        let prior_key = previous_quarter_key(quarter);
        match decode_case_list(self.source.fetch_audits_by_quarter(&prior_key)) {
            Ok(cases) => cases,
            Err(err) => {
                warn!("prior quarter {prior_key} treated as empty: {err}");
                Vec::new()
            }
        }
    }

    pub fn auto_select<R: Rng + ?Sized>(
        &self,
        roster: &[User],
        quarter: Quarter,
        rng: &mut R,
    ) -> Result<SelectionResult, ContractViolation> {
        let prior = self.prior_quarter_cases(quarter);
        self.engine.run(roster, &prior, quarter, rng)
    }
}
