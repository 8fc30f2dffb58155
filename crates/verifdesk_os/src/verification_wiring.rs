#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use log::{info, warn};
use rand::Rng;
use verifdesk_engines::access::{permitted_actions, VerificationPolicy};
use verifdesk_engines::lifecycle::{LifecycleConfig, VerificationLifecycle};
use verifdesk_kernel_contracts::case::{AuditCase, AuditCaseId};
use verifdesk_kernel_contracts::completion::CompletionPayload;
use verifdesk_kernel_contracts::quarter::{Quarter, QuarterKey};
use verifdesk_kernel_contracts::roster::User;
use verifdesk_kernel_contracts::selection::SelectionResult;
use verifdesk_kernel_contracts::verification::{
    DraftPatch, PermittedActions, QuarterProgress, RecordToken, VerificationError,
    VerificationRecord,
};
use verifdesk_kernel_contracts::ContractViolation;
use verifdesk_storage::repo::VerificationRepo;
use verifdesk_storage::StorageError;

use crate::ports::{CaseSource, CompletionSink};
use crate::selection_wiring::SelectionWiring;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerificationWiringConfig {
    pub submit_completion_on_finalize: bool,
}

impl VerificationWiringConfig {
    pub fn mvp_v1(submit_completion_on_finalize: bool) -> Self {
        Self {
            submit_completion_on_finalize,
        }
    }
}

/// Runs lifecycle transitions against the repository.
///
/// Each call takes the `(state, verifier)` token the caller last observed.
/// If the stored record moved on since then the call fails with `Conflict`
/// and nothing is written; the caller re-reads and re-renders.
#[derive(Debug)]
pub struct VerificationWiring<P, R, S>
where
    P: VerificationPolicy,
    R: VerificationRepo,
    S: CompletionSink,
{
    config: VerificationWiringConfig,
    lifecycle: VerificationLifecycle<P>,
    repo: R,
    sink: S,
}

impl<P, R, S> VerificationWiring<P, R, S>
where
    P: VerificationPolicy,
    R: VerificationRepo,
    S: CompletionSink,
{
    pub fn new(
        config: VerificationWiringConfig,
        lifecycle_config: LifecycleConfig,
        policy: P,
        repo: R,
        sink: S,
    ) -> Result<Self, ContractViolation> {
        Ok(Self {
            config,
            lifecycle: VerificationLifecycle::new(lifecycle_config, policy)?,
            repo,
            sink,
        })
    }

    pub fn repo(&self) -> &R {
        &self.repo
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn record(&self, case_id: &AuditCaseId) -> Option<&VerificationRecord> {
        self.repo.record_row(case_id)
    }

    pub fn start_or_resume(
        &mut self,
        user: &User,
        case_id: &AuditCaseId,
        observed: &RecordToken,
        now: DateTime<Utc>,
    ) -> Result<VerificationRecord, VerificationError> {
        let (case, current) = self.load(case_id, observed)?;
        let next = self.lifecycle.start_or_resume(user, &case, &current)?;
        self.commit(&current, next, user, now)
    }

    pub fn save_draft(
        &mut self,
        user: &User,
        case_id: &AuditCaseId,
        observed: &RecordToken,
        patch: DraftPatch,
        now: DateTime<Utc>,
    ) -> Result<VerificationRecord, VerificationError> {
        let (case, current) = self.load(case_id, observed)?;
        let next = self.lifecycle.save_draft(user, &case, &current, patch)?;
        self.commit(&current, next, user, now)
    }

    /// Commits first, then reports. A failed report leaves the record
    /// `VERIFIED` and surfaces as `Submission`.
    pub fn finalize(
        &mut self,
        user: &User,
        case_id: &AuditCaseId,
        observed: &RecordToken,
        patch: DraftPatch,
        now: DateTime<Utc>,
    ) -> Result<VerificationRecord, VerificationError> {
        let (case, current) = self.load(case_id, observed)?;
        let next = self.lifecycle.finalize(user, &case, &current, patch, now)?;
        let committed = self.commit(&current, next, user, now)?;
        if self.config.submit_completion_on_finalize {
            self.submit(user, &committed)?;
        }
        Ok(committed)
    }

    pub fn permitted_actions(
        &self,
        user: &User,
        case_id: &AuditCaseId,
    ) -> Result<PermittedActions, VerificationError> {
        let (case, record) = self.rows(case_id)?;
        Ok(permitted_actions(
            self.lifecycle.policy(),
            user,
            case,
            record,
        ))
    }

    pub fn quarter_progress(&self, quarter_key: &QuarterKey) -> QuarterProgress {
        self.repo.quarter_progress_row(quarter_key)
    }

    /// Runs auto-selection and replaces the quarter's previous auto-selected set.
    /// Fails with `Conflict` once a record of that set has been claimed.
    pub fn auto_select_quarter<C, G>(
        &mut self,
        selection: &SelectionWiring<C>,
        roster: &[User],
        quarter: Quarter,
        rng: &mut G,
    ) -> Result<SelectionResult, VerificationError>
    where
        C: CaseSource,
        G: Rng + ?Sized,
    {
        let result = selection.auto_select(roster, quarter, rng)?;
        self.store_auto_selection(result.clone())?;
        Ok(result)
    }

    pub fn store_auto_selection(
        &mut self,
        selection: SelectionResult,
    ) -> Result<usize, VerificationError> {
        let quarter_key = selection.quarter_key.clone();
        let created = match self.repo.replace_auto_selection_rows(selection) {
            Ok(created) => created,
            Err(StorageError::RowInUse { case_id, .. }) => {
                warn!("quarter {quarter_key}: auto-selection kept, {case_id} is under review");
                return Err(VerificationError::Conflict { case_id });
            }
            Err(err) => return Err(storage_failure(err)),
        };
        info!("quarter {quarter_key}: {created} auto-selected records");
        Ok(created)
    }

    pub fn select_cases_manually(
        &mut self,
        quarter_key: &QuarterKey,
        cases: Vec<AuditCase>,
    ) -> Result<usize, VerificationError> {
        let created = self
            .repo
            .insert_manual_selection_rows(quarter_key, cases)
            .map_err(storage_failure)?;
        info!("quarter {quarter_key}: {created} manually selected records");
        Ok(created)
    }

    pub fn reset_quarter(&mut self, quarter_key: &QuarterKey) -> usize {
        let removed = self.repo.reset_quarter_rows(quarter_key);
        info!("quarter {quarter_key} reset: {removed} records removed");
        removed
    }

    fn rows(
        &self,
        case_id: &AuditCaseId,
    ) -> Result<(&AuditCase, &VerificationRecord), VerificationError> {
        let not_found = || VerificationError::CaseNotFound {
            case_id: case_id.clone(),
        };
        let case = self.repo.case_row(case_id).ok_or_else(not_found)?;
        let record = self.repo.record_row(case_id).ok_or_else(not_found)?;
        Ok((case, record))
    }

    fn load(
        &self,
        case_id: &AuditCaseId,
        observed: &RecordToken,
    ) -> Result<(AuditCase, VerificationRecord), VerificationError> {
        let (case, record) = self.rows(case_id)?;
        if record.token() != *observed {
            warn!(
                "conflict on {case_id}: observed {}, stored {}",
                observed.state.as_str(),
                record.state.as_str()
            );
            return Err(VerificationError::Conflict {
                case_id: case_id.clone(),
            });
        }
        Ok((case.clone(), record.clone()))
    }

    fn commit(
        &mut self,
        current: &VerificationRecord,
        next: VerificationRecord,
        user: &User,
        now: DateTime<Utc>,
    ) -> Result<VerificationRecord, VerificationError> {
        let case_id = current.case_id.clone();
        match self
            .repo
            .commit_transition_row(&current.token(), next.clone(), &user.id, now)
        {
            Ok(seq) => {
                info!(
                    "case {case_id}: {} -> {} by {} (seq {seq})",
                    current.state.as_str(),
                    next.state.as_str(),
                    user.id
                );
                Ok(next)
            }
            Err(StorageError::StaleToken { .. }) => {
                warn!("conflict on {case_id}: stored record changed during commit");
                Err(VerificationError::Conflict { case_id })
            }
            Err(StorageError::NotFound { .. }) => Err(VerificationError::CaseNotFound { case_id }),
            Err(err) => Err(storage_failure(err)),
        }
    }

    fn submit(&self, user: &User, record: &VerificationRecord) -> Result<(), VerificationError> {
        let fields = record.fields.clone().unwrap_or_default();
        let payload = CompletionPayload::v1(user.id.clone(), fields)?;
        self.sink
            .submit_completion(&record.case_id, &payload)
            .map_err(|err| {
                warn!("completion for {} not delivered: {err:#}", record.case_id);
                VerificationError::Submission {
                    detail: format!("{err:#}"),
                }
            })
    }
}

fn storage_failure(err: StorageError) -> VerificationError {
    match err {
        StorageError::ContractViolation(violation) => VerificationError::Contract(violation),
        StorageError::DuplicateKey { table, .. } => {
            VerificationError::Contract(ContractViolation::InvalidValue {
                field: table,
                reason: "case id already selected",
            })
        }
        StorageError::AppendOnlyViolation { table } => {
            VerificationError::Contract(ContractViolation::InvalidValue {
                field: table,
                reason: "append-only",
            })
        }
        StorageError::RowInUse { case_id, .. } => VerificationError::Conflict { case_id },
        StorageError::NotFound { table, .. } | StorageError::StaleToken { table, .. } => {
            VerificationError::Contract(ContractViolation::InvalidValue {
                field: table,
                reason: "row changed or missing",
            })
        }
    }
}
