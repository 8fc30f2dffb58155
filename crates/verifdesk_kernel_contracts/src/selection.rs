#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::case::AuditCase;
use crate::quarter::QuarterKey;
use crate::{ContractViolation, Validate};

/// Filler candidates drawn per auto-selection run. Business constant.
pub const PREVIOUS_QUARTER_RANDOM_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SelectionOrigin {
    CurrentQuarterUser,
    PreviousQuarterRandom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionCandidate {
    pub case: AuditCase,
    pub origin: SelectionOrigin,
}

/// Ordered candidate set for one quarter: user candidates first, then filler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    pub quarter_key: QuarterKey,
    pub candidates: Vec<SelectionCandidate>,
}

impl SelectionResult {
    pub fn v1(
        quarter_key: QuarterKey,
        candidates: Vec<SelectionCandidate>,
    ) -> Result<Self, ContractViolation> {
        let out = Self {
            quarter_key,
            candidates,
        };
        out.validate()?;
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn count_by_origin(&self, origin: SelectionOrigin) -> usize {
        self.candidates
            .iter()
            .filter(|c| c.origin == origin)
            .count()
    }

    pub fn cases(&self) -> impl Iterator<Item = &AuditCase> {
        self.candidates.iter().map(|c| &c.case)
    }
}

impl Validate for SelectionResult {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.quarter_key.validate()?;
        let mut seen = BTreeSet::new();
        let mut filler_started = false;
        for candidate in &self.candidates {
            candidate.case.validate()?;
            if !seen.insert(candidate.case.id.as_str()) {
                return Err(ContractViolation::InvalidValue {
                    field: "selection_result.candidates",
                    reason: "candidate ids must be unique",
                });
            }
            match candidate.origin {
                SelectionOrigin::CurrentQuarterUser => {
                    if filler_started {
                        return Err(ContractViolation::InvalidValue {
                            field: "selection_result.candidates",
                            reason: "user candidates must precede random candidates",
                        });
                    }
                    if candidate.case.owning_user_id.is_none() {
                        return Err(ContractViolation::InvalidValue {
                            field: "selection_result.candidates.case.owning_user_id",
                            reason: "must be present for CURRENT_QUARTER_USER",
                        });
                    }
                }
                SelectionOrigin::PreviousQuarterRandom => {
                    filler_started = true;
                    if candidate.case.owning_user_id.is_some() {
                        return Err(ContractViolation::InvalidValue {
                            field: "selection_result.candidates.case.owning_user_id",
                            reason: "must be absent for PREVIOUS_QUARTER_RANDOM",
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
