#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::roster::UserId;
use crate::verification::{FindingFlags, VerificationFields};
use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Completed,
}

/// Body of `submitCompletion`. Serializes to exactly seven keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CompletionPayload {
    pub auditor: UserId,
    pub rating: String,
    pub comment: String,
    pub special_findings: FindingFlags,
    pub detailed_findings: FindingFlags,
    pub status: CompletionStatus,
    pub is_completed: bool,
}

impl CompletionPayload {
    pub fn v1(auditor: UserId, fields: VerificationFields) -> Result<Self, ContractViolation> {
        let out = Self {
            auditor,
            rating: fields.rating,
            comment: fields.comment,
            special_findings: fields.special_findings,
            detailed_findings: fields.detailed_findings,
            status: CompletionStatus::Completed,
            is_completed: true,
        };
        out.validate()?;
        Ok(out)
    }
}

impl Validate for CompletionPayload {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.auditor.validate()?;
        if self.rating.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "completion_payload.rating",
                reason: "must not be empty",
            });
        }
        if !self.is_completed {
            return Err(ContractViolation::InvalidValue {
                field: "completion_payload.is_completed",
                reason: "must be true",
            });
        }
        self.special_findings.validate()?;
        self.detailed_findings.validate()
    }
}
