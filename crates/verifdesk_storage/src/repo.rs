#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use verifdesk_kernel_contracts::case::{AuditCase, AuditCaseId};
use verifdesk_kernel_contracts::quarter::QuarterKey;
use verifdesk_kernel_contracts::roster::UserId;
use verifdesk_kernel_contracts::selection::SelectionResult;
use verifdesk_kernel_contracts::verification::{
    QuarterProgress, RecordToken, VerificationRecord,
};

use crate::store::{StorageError, TransitionLedgerRow, VerificationStore};

/// Typed repository interface for selected cases and their verification records.
pub trait VerificationRepo {
    fn replace_auto_selection_rows(
        &mut self,
        selection: SelectionResult,
    ) -> Result<usize, StorageError>;
    fn insert_manual_selection_rows(
        &mut self,
        quarter_key: &QuarterKey,
        cases: Vec<AuditCase>,
    ) -> Result<usize, StorageError>;
    fn reset_quarter_rows(&mut self, quarter_key: &QuarterKey) -> usize;

    fn commit_transition_row(
        &mut self,
        expected: &RecordToken,
        next: VerificationRecord,
        actor: &UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    fn case_row(&self, case_id: &AuditCaseId) -> Option<&AuditCase>;
    fn record_row(&self, case_id: &AuditCaseId) -> Option<&VerificationRecord>;
    fn quarter_record_rows(&self, quarter_key: &QuarterKey) -> Vec<&VerificationRecord>;
    fn quarter_progress_row(&self, quarter_key: &QuarterKey) -> QuarterProgress;
    fn transition_ledger_rows(&self) -> &[TransitionLedgerRow];
}

impl VerificationRepo for VerificationStore {
    fn replace_auto_selection_rows(
        &mut self,
        selection: SelectionResult,
    ) -> Result<usize, StorageError> {
        self.replace_auto_selection(selection)
    }

    fn insert_manual_selection_rows(
        &mut self,
        quarter_key: &QuarterKey,
        cases: Vec<AuditCase>,
    ) -> Result<usize, StorageError> {
        self.select_cases(quarter_key, cases)
    }

    fn reset_quarter_rows(&mut self, quarter_key: &QuarterKey) -> usize {
        self.reset_quarter(quarter_key)
    }

    fn commit_transition_row(
        &mut self,
        expected: &RecordToken,
        next: VerificationRecord,
        actor: &UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        self.commit_transition(expected, next, actor, at)
    }

    fn case_row(&self, case_id: &AuditCaseId) -> Option<&AuditCase> {
        VerificationStore::case_row(self, case_id)
    }

    fn record_row(&self, case_id: &AuditCaseId) -> Option<&VerificationRecord> {
        VerificationStore::record_row(self, case_id)
    }

    fn quarter_record_rows(&self, quarter_key: &QuarterKey) -> Vec<&VerificationRecord> {
        self.records_for_quarter(quarter_key)
    }

    fn quarter_progress_row(&self, quarter_key: &QuarterKey) -> QuarterProgress {
        self.quarter_progress(quarter_key)
    }

    fn transition_ledger_rows(&self) -> &[TransitionLedgerRow] {
        VerificationStore::transition_ledger_rows(self)
    }
}
