#![forbid(unsafe_code)]

use chrono::{DateTime, TimeZone, Utc};
use verifdesk_engines::access::FourEyesPolicy;
use verifdesk_engines::lifecycle::{LifecycleConfig, VerificationLifecycle};
use verifdesk_kernel_contracts::case::{AuditCase, AuditCaseId, CaseMetadata};
use verifdesk_kernel_contracts::quarter::QuarterKey;
use verifdesk_kernel_contracts::roster::{User, UserId, UserRole};
use verifdesk_kernel_contracts::verification::{DraftPatch, VerificationState};
use verifdesk_storage::repo::VerificationRepo;
use verifdesk_storage::{StorageError, VerificationStore};

fn q() -> QuarterKey {
    QuarterKey::parse("Q3-2026").unwrap()
}

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 8, 14, 9, minute, 0).unwrap()
}

fn user(id: &str, role: UserRole) -> User {
    User::v1(UserId::new(id).unwrap(), id, role, true).unwrap()
}

fn case_id() -> AuditCaseId {
    AuditCaseId::new("dbw_v_case_1").unwrap()
}

fn store_with_case() -> (VerificationStore, AuditCase) {
    let case = AuditCase::v1(
        case_id(),
        Some(UserId::new("dbw_v_staff_owner").unwrap()),
        24_000,
        q(),
        CaseMetadata::default(),
    )
    .unwrap();
    let mut s = VerificationStore::new_in_memory();
    s.insert_manual_selection_rows(&q(), vec![case.clone()])
        .unwrap();
    (s, case)
}

fn lifecycle() -> VerificationLifecycle<FourEyesPolicy> {
    VerificationLifecycle::new(LifecycleConfig::mvp_v1(), FourEyesPolicy).unwrap()
}

#[test]
fn at_verif_db_01_full_lifecycle_is_ledgered() {
    let (mut s, case) = store_with_case();
    let lc = lifecycle();
    let spec = user("dbw_v_spec_1", UserRole::Specialist);

    let observed = s.record_row(&case_id()).unwrap().clone();
    let started = lc.start_or_resume(&spec, &case, &observed).unwrap();
    s.commit_transition_row(&observed.token(), started.clone(), &spec.id, at(0))
        .unwrap();

    let patch = DraftPatch {
        comment: Some("checked payout history".to_string()),
        ..DraftPatch::default()
    };
    let drafted = lc.save_draft(&spec, &case, &started, patch).unwrap();
    s.commit_transition_row(&started.token(), drafted.clone(), &spec.id, at(1))
        .unwrap();

    let done = lc
        .finalize(
            &spec,
            &case,
            &drafted,
            DraftPatch {
                rating: Some("A".to_string()),
                ..DraftPatch::default()
            },
            at(2),
        )
        .unwrap();
    let seq = s
        .commit_transition_row(&drafted.token(), done, &spec.id, at(2))
        .unwrap();
    assert_eq!(seq, 3);

    let stored = s.record_row(&case_id()).unwrap();
    assert_eq!(stored.state, VerificationState::Verified);
    assert_eq!(stored.completed_at, Some(at(2)));
    let fields = stored.fields.as_ref().unwrap();
    assert_eq!(fields.comment, "checked payout history");
    assert_eq!(fields.rating, "A");

    let ledger = s.transition_ledger_rows();
    assert_eq!(ledger.len(), 3);
    assert_eq!(ledger[0].from_state, VerificationState::NotVerified);
    assert_eq!(ledger[0].to_state, VerificationState::InProgress);
    assert_eq!(ledger[1].from_state, ledger[1].to_state);
    assert_eq!(ledger[2].to_state, VerificationState::Verified);
}

#[test]
fn at_verif_db_02_concurrent_start_yields_single_winner() {
    let (mut s, case) = store_with_case();
    let lc = lifecycle();
    let a = user("dbw_v_spec_a", UserRole::Specialist);
    let b = user("dbw_v_tl_b", UserRole::TeamLeader);

    let observed = s.record_row(&case_id()).unwrap().clone();
    let by_a = lc.start_or_resume(&a, &case, &observed).unwrap();
    let by_b = lc.start_or_resume(&b, &case, &observed).unwrap();

    s.commit_transition_row(&observed.token(), by_a, &a.id, at(0))
        .unwrap();
    let err = s
        .commit_transition_row(&observed.token(), by_b, &b.id, at(0))
        .unwrap_err();
    assert!(matches!(err, StorageError::StaleToken { .. }));
    assert!(s.record_row(&case_id()).unwrap().is_held_by(&a.id));
    assert_eq!(s.transition_ledger_rows().len(), 1);
}

#[test]
fn at_verif_db_03_unknown_case_is_not_found() {
    let (mut s, _) = store_with_case();
    let mut ghost = s.record_row(&case_id()).unwrap().clone();
    let token = ghost.token();
    ghost.case_id = AuditCaseId::new("dbw_v_ghost").unwrap();
    let err = s
        .commit_transition_row(&token, ghost, &UserId::new("x").unwrap(), at(0))
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound { .. }));
}

#[test]
fn at_verif_db_04_progress_counts_current_rows() {
    let (mut s, case) = store_with_case();
    let spec = user("dbw_v_spec_1", UserRole::Specialist);
    let observed = s.record_row(&case_id()).unwrap().clone();
    let started = lifecycle().start_or_resume(&spec, &case, &observed).unwrap();
    s.commit_transition_row(&observed.token(), started, &spec.id, at(0))
        .unwrap();

    let p = s.quarter_progress_row(&q());
    assert_eq!(p.total, 1);
    assert_eq!(p.in_progress, 1);
    assert!(!p.is_complete());
}

#[test]
fn at_verif_db_05_reset_keeps_ledger_history() {
    let (mut s, case) = store_with_case();
    let spec = user("dbw_v_spec_1", UserRole::Specialist);
    let observed = s.record_row(&case_id()).unwrap().clone();
    let started = lifecycle().start_or_resume(&spec, &case, &observed).unwrap();
    s.commit_transition_row(&observed.token(), started, &spec.id, at(0))
        .unwrap();

    assert_eq!(s.reset_quarter_rows(&q()), 1);
    assert!(s.record_row(&case_id()).is_none());
    assert!(s.quarter_record_rows(&q()).is_empty());
    assert_eq!(s.transition_ledger_rows().len(), 1);
}
