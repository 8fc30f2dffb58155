#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use log::debug;
use verifdesk_kernel_contracts::case::AuditCase;
use verifdesk_kernel_contracts::roster::User;
use verifdesk_kernel_contracts::verification::{
    DraftPatch, FindingFlags, VerificationError, VerificationFields, VerificationRecord,
    VerificationState,
};
use verifdesk_kernel_contracts::ContractViolation;

use crate::access::{decide_draft_edit, AccessDecision, VerificationPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub max_rating_len: usize,
    pub max_comment_len: usize,
    pub max_findings: usize,
}

impl LifecycleConfig {
    pub fn mvp_v1() -> Self {
        Self {
            max_rating_len: 64,
            max_comment_len: 4_000,
            max_findings: 64,
        }
    }
}

/// State machine for one verification record:
/// `NOT_VERIFIED -> IN_PROGRESS -> VERIFIED`, never backwards.
///
/// Every transition is pure: it takes the record the caller observed and
/// returns the next record, leaving the input untouched. Persisting the result
/// (and rejecting it when the stored record moved on) is the caller's job.
#[derive(Debug, Clone)]
pub struct VerificationLifecycle<P>
where
    P: VerificationPolicy,
{
    config: LifecycleConfig,
    policy: P,
}

impl<P> VerificationLifecycle<P>
where
    P: VerificationPolicy,
{
    pub fn new(config: LifecycleConfig, policy: P) -> Result<Self, ContractViolation> {
        if config.max_rating_len == 0 || config.max_rating_len > 64 {
            return Err(ContractViolation::InvalidValue {
                field: "lifecycle_config.max_rating_len",
                reason: "must be within 1..=64",
            });
        }
        if config.max_comment_len > 4_000 {
            return Err(ContractViolation::InvalidValue {
                field: "lifecycle_config.max_comment_len",
                reason: "must be <= 4000",
            });
        }
        if config.max_findings > 64 {
            return Err(ContractViolation::InvalidValue {
                field: "lifecycle_config.max_findings",
                reason: "must be <= 64",
            });
        }
        Ok(Self { config, policy })
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    pub fn start_or_resume(
        &self,
        user: &User,
        case: &AuditCase,
        record: &VerificationRecord,
    ) -> Result<VerificationRecord, VerificationError> {
        ensure_same_case(case, record)?;
        authorize(self.policy.decide(user, case, record), user, record)?;

        let mut next = record.clone();
        match record.state {
            VerificationState::NotVerified => {
                next.state = VerificationState::InProgress;
                next.verifier_id = Some(user.id.clone());
                next.fields = Some(VerificationFields::default());
            }
            VerificationState::InProgress if record.is_held_by(&user.id) => {}
            VerificationState::InProgress => {
                // Escalation take-over: the draft stays, the holder changes.
                next.verifier_id = Some(user.id.clone());
            }
            VerificationState::Verified => {
                return Err(VerificationError::Contract(ContractViolation::InvalidValue {
                    field: "verification_record.state",
                    reason: "policy allowed a transition out of VERIFIED",
                }));
            }
        }
        Ok(next)
    }

    /// Keeps the reviewer's input as entered without changing state; models
    /// "Cancel". Shape checks run only in [`Self::finalize`].
    pub fn save_draft(
        &self,
        user: &User,
        case: &AuditCase,
        record: &VerificationRecord,
        patch: DraftPatch,
    ) -> Result<VerificationRecord, VerificationError> {
        ensure_same_case(case, record)?;
        authorize(
            decide_draft_edit(&self.policy, user, case, record),
            user,
            record,
        )?;

        let mut fields = record.fields.clone().unwrap_or_default();
        fields.apply(patch);

        let mut next = record.clone();
        next.fields = Some(fields);
        Ok(next)
    }

    /// One-way. Merges `patch` over any saved draft, then requires a rating.
    pub fn finalize(
        &self,
        user: &User,
        case: &AuditCase,
        record: &VerificationRecord,
        patch: DraftPatch,
        now: DateTime<Utc>,
    ) -> Result<VerificationRecord, VerificationError> {
        ensure_same_case(case, record)?;
        authorize(self.policy.decide(user, case, record), user, record)?;

        let mut fields = record.fields.clone().unwrap_or_default();
        fields.apply(patch);
        if fields.rating.trim().is_empty() {
            return Err(VerificationError::Validation {
                field: "rating",
                reason: "must not be empty",
            });
        }
        self.check_shape(&fields)?;

        let mut next = record.clone();
        next.state = VerificationState::Verified;
        next.verifier_id = Some(user.id.clone());
        next.fields = Some(fields);
        next.completed_at = Some(now);
        next.is_completed = true;
        Ok(next)
    }

    fn check_shape(&self, fields: &VerificationFields) -> Result<(), VerificationError> {
        if fields.rating.len() > self.config.max_rating_len {
            return Err(VerificationError::Validation {
                field: "rating",
                reason: "exceeds max length",
            });
        }
        if fields.rating.chars().any(char::is_control) {
            return Err(VerificationError::Validation {
                field: "rating",
                reason: "must not contain control characters",
            });
        }
        if fields.comment.len() > self.config.max_comment_len {
            return Err(VerificationError::Validation {
                field: "comment",
                reason: "exceeds max length",
            });
        }
        self.check_flags("specialFindings", &fields.special_findings)?;
        self.check_flags("detailedFindings", &fields.detailed_findings)
    }

    fn check_flags(
        &self,
        field: &'static str,
        flags: &FindingFlags,
    ) -> Result<(), VerificationError> {
        if flags.len() > self.config.max_findings {
            return Err(VerificationError::Validation {
                field,
                reason: "too many findings",
            });
        }
        flags
            .validate_names()
            .map_err(|reason| VerificationError::Validation { field, reason })
    }
}

fn ensure_same_case(case: &AuditCase, record: &VerificationRecord) -> Result<(), VerificationError> {
    if case.id != record.case_id {
        return Err(VerificationError::Contract(ContractViolation::InvalidValue {
            field: "verification_record.case_id",
            reason: "must match the audit case",
        }));
    }
    Ok(())
}

fn authorize(
    decision: AccessDecision,
    user: &User,
    record: &VerificationRecord,
) -> Result<(), VerificationError> {
    if decision.allowed {
        return Ok(());
    }
    debug!(
        "denied {} on {} ({}): reason {:#x}",
        user.id,
        record.case_id,
        record.state.as_str(),
        decision.reason_code.0
    );
    Err(VerificationError::PermissionDenied {
        reason_code: decision.reason_code,
        message: decision.message(),
    })
}
