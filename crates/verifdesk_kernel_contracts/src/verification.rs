#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::case::AuditCaseId;
use crate::common::{validate_text, validate_token};
use crate::quarter::QuarterKey;
use crate::roster::UserId;
use crate::{ContractViolation, ReasonCodeId, Validate};

pub const MAX_FINDING_FLAGS: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationState {
    NotVerified,
    InProgress,
    Verified,
}

impl VerificationState {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationState::NotVerified => "NOT_VERIFIED",
            VerificationState::InProgress => "IN_PROGRESS",
            VerificationState::Verified => "VERIFIED",
        }
    }
}

/// Named boolean findings, e.g. `{"missingSignature": true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FindingFlags(BTreeMap<String, bool>);

impl FindingFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: bool) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Checks flag names only; returns the failing reason.
    pub fn validate_names(&self) -> Result<(), &'static str> {
        for name in self.0.keys() {
            if let Err(v) = validate_token("finding_flags.name", name, 64) {
                return Err(match v {
                    ContractViolation::InvalidValue { reason, .. } => reason,
                    ContractViolation::InvalidRange { .. } => "out of range",
                });
            }
        }
        Ok(())
    }

    pub fn raised(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|(_, raised)| **raised)
            .map(|(name, _)| name.as_str())
    }
}

impl FromIterator<(String, bool)> for FindingFlags {
    fn from_iter<I: IntoIterator<Item = (String, bool)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Validate for FindingFlags {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0.len() > MAX_FINDING_FLAGS {
            return Err(ContractViolation::InvalidValue {
                field: "finding_flags",
                reason: "must contain <= 64 entries",
            });
        }
        self.validate_names()
            .map_err(|reason| ContractViolation::InvalidValue {
                field: "finding_flags.name",
                reason,
            })
    }
}

/// Reviewer input. Only present once a record has left `NOT_VERIFIED`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationFields {
    pub rating: String,
    pub comment: String,
    pub special_findings: FindingFlags,
    pub detailed_findings: FindingFlags,
}

impl VerificationFields {
    pub fn apply(&mut self, patch: DraftPatch) {
        if let Some(rating) = patch.rating {
            self.rating = rating;
        }
        if let Some(comment) = patch.comment {
            self.comment = comment;
        }
        if let Some(flags) = patch.special_findings {
            self.special_findings = flags;
        }
        if let Some(flags) = patch.detailed_findings {
            self.detailed_findings = flags;
        }
    }
}

impl Validate for VerificationFields {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("verification_fields.rating", &self.rating, 64)?;
        validate_text("verification_fields.comment", &self.comment, 4000)?;
        self.special_findings.validate()?;
        self.detailed_findings.validate()
    }
}

/// Partial update for `saveDraft`; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftPatch {
    #[serde(default)]
    pub rating: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub special_findings: Option<FindingFlags>,
    #[serde(default)]
    pub detailed_findings: Option<FindingFlags>,
}

impl From<VerificationFields> for DraftPatch {
    fn from(fields: VerificationFields) -> Self {
        Self {
            rating: Some(fields.rating),
            comment: Some(fields.comment),
            special_findings: Some(fields.special_findings),
            detailed_findings: Some(fields.detailed_findings),
        }
    }
}

/// Optimistic-lock token: the `(state, verifier)` pair a writer observed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordToken {
    pub state: VerificationState,
    pub verifier_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationRecord {
    pub case_id: AuditCaseId,
    pub quarter_key: QuarterKey,
    pub state: VerificationState,
    pub verifier_id: Option<UserId>,
    pub fields: Option<VerificationFields>,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
}

impl VerificationRecord {
    /// The record created when a case is selected for a quarter.
    pub fn not_verified(case_id: AuditCaseId, quarter_key: QuarterKey) -> Self {
        Self {
            case_id,
            quarter_key,
            state: VerificationState::NotVerified,
            verifier_id: None,
            fields: None,
            completed_at: None,
            is_completed: false,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.state == VerificationState::Verified
    }

    pub fn is_held_by(&self, user_id: &UserId) -> bool {
        self.verifier_id.as_ref() == Some(user_id)
    }

    pub fn token(&self) -> RecordToken {
        RecordToken {
            state: self.state,
            verifier_id: self.verifier_id.clone(),
        }
    }
}

impl Validate for VerificationRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.case_id.validate()?;
        self.quarter_key.validate()?;
        match self.state {
            VerificationState::NotVerified => {
                if self.verifier_id.is_some() {
                    return Err(ContractViolation::InvalidValue {
                        field: "verification_record.verifier_id",
                        reason: "must be absent when state=NOT_VERIFIED",
                    });
                }
                if self.fields.is_some() {
                    return Err(ContractViolation::InvalidValue {
                        field: "verification_record.fields",
                        reason: "must be absent when state=NOT_VERIFIED",
                    });
                }
            }
            VerificationState::InProgress | VerificationState::Verified => {
                let Some(verifier_id) = &self.verifier_id else {
                    return Err(ContractViolation::InvalidValue {
                        field: "verification_record.verifier_id",
                        reason: "must be present once verification has started",
                    });
                };
                verifier_id.validate()?;
                let Some(fields) = &self.fields else {
                    return Err(ContractViolation::InvalidValue {
                        field: "verification_record.fields",
                        reason: "must be present once verification has started",
                    });
                };
                // Drafts are stored as entered; shape is enforced on the final write.
                if self.state == VerificationState::Verified {
                    fields.validate()?;
                }
            }
        }
        let verified = self.state == VerificationState::Verified;
        if self.is_completed != verified {
            return Err(ContractViolation::InvalidValue {
                field: "verification_record.is_completed",
                reason: "must be true iff state=VERIFIED",
            });
        }
        if self.completed_at.is_some() != verified {
            return Err(ContractViolation::InvalidValue {
                field: "verification_record.completed_at",
                reason: "must be present iff state=VERIFIED",
            });
        }
        Ok(())
    }
}

/// One boolean per action button the presentation layer renders for a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermittedActions {
    pub view: bool,
    pub start_or_resume: bool,
    pub save_draft: bool,
    pub finalize: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterProgress {
    pub total: usize,
    pub not_verified: usize,
    pub in_progress: usize,
    pub verified: usize,
}

impl QuarterProgress {
    pub fn count(&mut self, state: VerificationState) {
        self.total += 1;
        match state {
            VerificationState::NotVerified => self.not_verified += 1,
            VerificationState::InProgress => self.in_progress += 1,
            VerificationState::Verified => self.verified += 1,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.verified == self.total
    }
}

/// Typed failure of a lifecycle transition or boundary call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("permission denied: {message}")]
    PermissionDenied {
        reason_code: ReasonCodeId,
        message: &'static str,
    },
    #[error("validation failed for {field}: {reason}")]
    Validation {
        field: &'static str,
        reason: &'static str,
    },
    #[error("record {case_id} changed since it was read")]
    Conflict { case_id: AuditCaseId },
    #[error("{source_name} returned no usable data: {detail}")]
    DataUnavailable {
        source_name: &'static str,
        detail: String,
    },
    #[error("no verification record for case {case_id}")]
    CaseNotFound { case_id: AuditCaseId },
    #[error("completion submission failed: {detail}")]
    Submission { detail: String },
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

impl VerificationError {
    /// Outcomes the caller handles by re-rendering current state.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            VerificationError::PermissionDenied { .. }
                | VerificationError::Conflict { .. }
                | VerificationError::Validation { .. }
        )
    }
}
