#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;
use thiserror::Error;
use verifdesk_kernel_contracts::case::{AuditCase, AuditCaseId};
use verifdesk_kernel_contracts::quarter::QuarterKey;
use verifdesk_kernel_contracts::roster::UserId;
use verifdesk_kernel_contracts::selection::SelectionResult;
use verifdesk_kernel_contracts::verification::{
    QuarterProgress, RecordToken, VerificationRecord, VerificationState,
};
use verifdesk_kernel_contracts::{ContractViolation, Validate};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("{table}: no row for {key}")]
    NotFound { table: &'static str, key: String },
    #[error("{table}: row {key} changed since it was observed")]
    StaleToken { table: &'static str, key: String },
    #[error("{table}: duplicate key {key}")]
    DuplicateKey { table: &'static str, key: String },
    #[error("{table}: row {case_id} is under review")]
    RowInUse {
        table: &'static str,
        case_id: AuditCaseId,
    },
    #[error("{table} is append-only")]
    AppendOnlyViolation { table: &'static str },
    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),
}

/// One committed lifecycle transition. `from == to` for draft saves and resumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionLedgerRow {
    pub seq: u64,
    pub case_id: AuditCaseId,
    pub quarter_key: QuarterKey,
    pub from_state: VerificationState,
    pub to_state: VerificationState,
    pub actor: UserId,
    pub at: DateTime<Utc>,
}

/// In-memory persistence boundary for verification records.
///
/// Records are keyed by case id and written only through
/// [`VerificationStore::commit_transition`], which compares the caller's
/// observed `(state, verifier)` token against the stored row first.
#[derive(Debug, Clone, Default)]
pub struct VerificationStore {
    cases: BTreeMap<AuditCaseId, AuditCase>,
    records: BTreeMap<AuditCaseId, VerificationRecord>,
    // Latest auto-selection per quarter; a re-run replaces it wholesale.
    auto_selections: BTreeMap<QuarterKey, SelectionResult>,
    transition_ledger: Vec<TransitionLedgerRow>,
}

impl VerificationStore {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    /// Drops the previous auto-selection of the quarter (cases and records)
    /// and creates `NOT_VERIFIED` records for the new candidates.
    ///
    /// Refused with [`StorageError::RowInUse`] once any record of the
    /// previous auto-selection has left `NOT_VERIFIED`.
    pub fn replace_auto_selection(
        &mut self,
        selection: SelectionResult,
    ) -> Result<usize, StorageError> {
        selection.validate()?;
        for case in selection.cases() {
            if case.quarter_key != selection.quarter_key {
                return Err(StorageError::ContractViolation(
                    ContractViolation::InvalidValue {
                        field: "selection_result.candidates.case.quarter_key",
                        reason: "must match selection quarter_key",
                    },
                ));
            }
        }

        let replaced: BTreeSet<AuditCaseId> = self
            .auto_selections
            .get(&selection.quarter_key)
            .map(|prev| prev.cases().map(|c| c.id.clone()).collect())
            .unwrap_or_default();
        for id in &replaced {
            if let Some(record) = self.records.get(id) {
                if record.state != VerificationState::NotVerified {
                    return Err(StorageError::RowInUse {
                        table: "verification_records",
                        case_id: id.clone(),
                    });
                }
            }
        }
        for case in selection.cases() {
            if self.cases.contains_key(&case.id) && !replaced.contains(&case.id) {
                return Err(StorageError::DuplicateKey {
                    table: "audit_cases",
                    key: case.id.to_string(),
                });
            }
        }

        for id in &replaced {
            self.cases.remove(id);
            self.records.remove(id);
        }
        for case in selection.cases() {
            self.records.insert(
                case.id.clone(),
                VerificationRecord::not_verified(case.id.clone(), case.quarter_key.clone()),
            );
            self.cases.insert(case.id.clone(), case.clone());
        }
        let created = selection.len();
        debug!(
            "auto-selection {} stored: {} replaced, {} created",
            selection.quarter_key,
            replaced.len(),
            created
        );
        self.auto_selections
            .insert(selection.quarter_key.clone(), selection);
        Ok(created)
    }

    /// Manual selection. Cases already selected for the quarter keep their record.
    pub fn select_cases(
        &mut self,
        quarter_key: &QuarterKey,
        cases: Vec<AuditCase>,
    ) -> Result<usize, StorageError> {
        for case in &cases {
            case.validate()?;
            if &case.quarter_key != quarter_key {
                return Err(StorageError::ContractViolation(
                    ContractViolation::InvalidValue {
                        field: "audit_case.quarter_key",
                        reason: "must match the selected quarter",
                    },
                ));
            }
            if let Some(existing) = self.cases.get(&case.id) {
                if &existing.quarter_key != quarter_key {
                    return Err(StorageError::DuplicateKey {
                        table: "audit_cases",
                        key: case.id.to_string(),
                    });
                }
            }
        }

        let mut created = 0;
        for case in cases {
            if self.cases.contains_key(&case.id) {
                continue;
            }
            self.records.insert(
                case.id.clone(),
                VerificationRecord::not_verified(case.id.clone(), case.quarter_key.clone()),
            );
            self.cases.insert(case.id.clone(), case);
            created += 1;
        }
        Ok(created)
    }

    /// Destroys every record of the quarter. The transition ledger is kept.
    pub fn reset_quarter(&mut self, quarter_key: &QuarterKey) -> usize {
        let ids: Vec<AuditCaseId> = self
            .cases
            .values()
            .filter(|c| &c.quarter_key == quarter_key)
            .map(|c| c.id.clone())
            .collect();
        for id in &ids {
            self.cases.remove(id);
            self.records.remove(id);
        }
        self.auto_selections.remove(quarter_key);
        ids.len()
    }

    pub fn commit_transition(
        &mut self,
        expected: &RecordToken,
        next: VerificationRecord,
        actor: &UserId,
        at: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        next.validate()?;
        let Some(current) = self.records.get(&next.case_id) else {
            return Err(StorageError::NotFound {
                table: "verification_records",
                key: next.case_id.to_string(),
            });
        };
        if current.token() != *expected {
            return Err(StorageError::StaleToken {
                table: "verification_records",
                key: next.case_id.to_string(),
            });
        }
        if current.quarter_key != next.quarter_key {
            return Err(StorageError::ContractViolation(
                ContractViolation::InvalidValue {
                    field: "verification_record.quarter_key",
                    reason: "must not change",
                },
            ));
        }
        if next.state < current.state {
            return Err(StorageError::ContractViolation(
                ContractViolation::InvalidValue {
                    field: "verification_record.state",
                    reason: "transitions never move backward",
                },
            ));
        }

        let seq = self.transition_ledger.len() as u64 + 1;
        self.transition_ledger.push(TransitionLedgerRow {
            seq,
            case_id: next.case_id.clone(),
            quarter_key: next.quarter_key.clone(),
            from_state: current.state,
            to_state: next.state,
            actor: actor.clone(),
            at,
        });
        self.records.insert(next.case_id.clone(), next);
        Ok(seq)
    }

    pub fn case_row(&self, case_id: &AuditCaseId) -> Option<&AuditCase> {
        self.cases.get(case_id)
    }

    pub fn record_row(&self, case_id: &AuditCaseId) -> Option<&VerificationRecord> {
        self.records.get(case_id)
    }

    pub fn records_for_quarter(&self, quarter_key: &QuarterKey) -> Vec<&VerificationRecord> {
        self.records
            .values()
            .filter(|r| &r.quarter_key == quarter_key)
            .collect()
    }

    pub fn quarter_progress(&self, quarter_key: &QuarterKey) -> QuarterProgress {
        let mut progress = QuarterProgress::default();
        for record in self.records_for_quarter(quarter_key) {
            progress.count(record.state);
        }
        progress
    }

    pub fn transition_ledger_rows(&self) -> &[TransitionLedgerRow] {
        &self.transition_ledger
    }

    pub fn attempt_overwrite_transition_row(&mut self, _seq: u64) -> Result<(), StorageError> {
        Err(StorageError::AppendOnlyViolation {
            table: "verification_transitions",
        })
    }
}
