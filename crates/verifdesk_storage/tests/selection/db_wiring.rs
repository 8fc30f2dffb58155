#![forbid(unsafe_code)]

use chrono::{TimeZone, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use verifdesk_engines::access::FourEyesPolicy;
use verifdesk_engines::lifecycle::{LifecycleConfig, VerificationLifecycle};
use verifdesk_engines::selection::{AutoSelection, SelectionConfig};
use verifdesk_kernel_contracts::case::{AuditCase, CaseMetadata};
use verifdesk_kernel_contracts::quarter::Quarter;
use verifdesk_kernel_contracts::roster::{User, UserId, UserRole};
use verifdesk_kernel_contracts::verification::{DraftPatch, VerificationState};
use verifdesk_storage::repo::VerificationRepo;
use verifdesk_storage::{StorageError, VerificationStore};

fn quarter() -> Quarter {
    Quarter::v1(3, 2026).unwrap()
}

fn roster(n: usize) -> Vec<User> {
    (0..n)
        .map(|i| {
            let role = if i % 2 == 0 {
                UserRole::Staff
            } else {
                UserRole::Specialist
            };
            User::v1(UserId::new(format!("dbw_s_u{i}")).unwrap(), "Reviewer", role, true)
                .unwrap()
        })
        .collect()
}

fn run(roster: &[User], seed: u64) -> verifdesk_kernel_contracts::selection::SelectionResult {
    let mut rng = StdRng::seed_from_u64(seed);
    AutoSelection::new(SelectionConfig::mvp_v1())
        .unwrap()
        .run(roster, &[], quarter(), &mut rng)
        .unwrap()
}

#[test]
fn at_select_db_01_rerun_replaces_previous_selection() {
    let mut s = VerificationStore::new_in_memory();
    let users = roster(4);

    assert_eq!(s.replace_auto_selection_rows(run(&users, 1)).unwrap(), 6);
    assert_eq!(s.replace_auto_selection_rows(run(&users, 2)).unwrap(), 6);

    let rows = s.quarter_record_rows(&quarter().key());
    assert_eq!(rows.len(), 6);
    assert!(rows
        .iter()
        .all(|r| r.state == VerificationState::NotVerified));
}

#[test]
fn at_select_db_02_smaller_roster_shrinks_selection() {
    let mut s = VerificationStore::new_in_memory();
    s.replace_auto_selection_rows(run(&roster(5), 7)).unwrap();
    s.replace_auto_selection_rows(run(&roster(2), 7)).unwrap();
    assert_eq!(s.quarter_progress_row(&quarter().key()).total, 4);
}

#[test]
fn at_select_db_03_manual_case_blocks_colliding_auto_id() {
    let mut s = VerificationStore::new_in_memory();
    let selection = run(&roster(1), 3);
    let first = selection.candidates[0].case.clone();
    let manual = AuditCase::v1(
        first.id.clone(),
        None,
        12_000,
        quarter().key(),
        CaseMetadata::default(),
    )
    .unwrap();
    s.insert_manual_selection_rows(&quarter().key(), vec![manual])
        .unwrap();

    let err = s.replace_auto_selection_rows(selection).unwrap_err();
    assert!(matches!(err, StorageError::DuplicateKey { .. }));
    assert_eq!(s.quarter_record_rows(&quarter().key()).len(), 1);
}

#[test]
fn at_select_db_04_manual_cases_survive_auto_rerun() {
    let mut s = VerificationStore::new_in_memory();
    let manual = AuditCase::v1(
        verifdesk_kernel_contracts::case::AuditCaseId::new("dbw_s_manual_1").unwrap(),
        None,
        12_000,
        quarter().key(),
        CaseMetadata::default(),
    )
    .unwrap();
    s.insert_manual_selection_rows(&quarter().key(), vec![manual])
        .unwrap();
    s.replace_auto_selection_rows(run(&roster(3), 1)).unwrap();
    s.replace_auto_selection_rows(run(&roster(3), 2)).unwrap();
    assert_eq!(s.quarter_record_rows(&quarter().key()).len(), 6);
}

#[test]
fn at_select_db_05_rerun_is_refused_once_review_started() {
    let mut s = VerificationStore::new_in_memory();
    let users = roster(2);
    s.replace_auto_selection_rows(run(&users, 1)).unwrap();

    let lc = VerificationLifecycle::new(LifecycleConfig::mvp_v1(), FourEyesPolicy).unwrap();
    let tl = User::v1(
        UserId::new("dbw_s_tl").unwrap(),
        "Lead",
        UserRole::TeamLeader,
        true,
    )
    .unwrap();
    let first = s.quarter_record_rows(&quarter().key())[0].case_id.clone();
    let second = s.quarter_record_rows(&quarter().key())[1].case_id.clone();
    let at = Utc.with_ymd_and_hms(2026, 8, 14, 9, 0, 0).unwrap();

    let case = s.case_row(&first).unwrap().clone();
    let observed = s.record_row(&first).unwrap().clone();
    let started = lc.start_or_resume(&tl, &case, &observed).unwrap();
    s.commit_transition_row(&observed.token(), started.clone(), &tl.id, at)
        .unwrap();
    let patch = DraftPatch {
        rating: Some("A".to_string()),
        ..DraftPatch::default()
    };
    let done = lc.finalize(&tl, &case, &started, patch, at).unwrap();
    s.commit_transition_row(&started.token(), done, &tl.id, at)
        .unwrap();

    let case = s.case_row(&second).unwrap().clone();
    let observed = s.record_row(&second).unwrap().clone();
    let claimed = lc.start_or_resume(&tl, &case, &observed).unwrap();
    s.commit_transition_row(&observed.token(), claimed, &tl.id, at)
        .unwrap();

    let err = s.replace_auto_selection_rows(run(&users, 2)).unwrap_err();
    assert!(matches!(err, StorageError::RowInUse { .. }));

    let verified = s.record_row(&first).unwrap();
    assert_eq!(verified.state, VerificationState::Verified);
    assert_eq!(verified.verifier_id.as_ref(), Some(&tl.id));
    let in_progress = s.record_row(&second).unwrap();
    assert_eq!(in_progress.state, VerificationState::InProgress);
    let progress = s.quarter_progress_row(&quarter().key());
    assert_eq!((progress.total, progress.verified, progress.in_progress), (4, 1, 1));

    s.reset_quarter_rows(&quarter().key());
    assert_eq!(s.replace_auto_selection_rows(run(&users, 2)).unwrap(), 4);
}
