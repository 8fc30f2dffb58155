#![forbid(unsafe_code)]

//! Property tests for the verification policy rules.

use proptest::prelude::*;

use verifdesk_engines::access::{can_verify, decide};
use verifdesk_kernel_contracts::case::{AuditCase, AuditCaseId, CaseMetadata};
use verifdesk_kernel_contracts::quarter::QuarterKey;
use verifdesk_kernel_contracts::roster::{User, UserId, UserRole};
use verifdesk_kernel_contracts::verification::{
    VerificationFields, VerificationRecord, VerificationState,
};

fn arb_role() -> impl Strategy<Value = UserRole> {
    prop_oneof![
        Just(UserRole::Staff),
        Just(UserRole::Specialist),
        Just(UserRole::TeamLeader),
        Just(UserRole::Reader),
        Just(UserRole::Unknown),
    ]
}

fn arb_state() -> impl Strategy<Value = VerificationState> {
    prop_oneof![
        Just(VerificationState::NotVerified),
        Just(VerificationState::InProgress),
        Just(VerificationState::Verified),
    ]
}

fn arb_id() -> impl Strategy<Value = UserId> {
    (0u8..4).prop_map(|n| UserId::new(format!("u_{n}")).unwrap())
}

fn user(id: UserId, role: UserRole, active: bool) -> User {
    User::v1(id, "Someone", role, active).unwrap()
}

fn case(owner: Option<UserId>) -> AuditCase {
    AuditCase::v1(
        AuditCaseId::new("case_p").unwrap(),
        owner,
        10_000,
        QuarterKey::parse("Q1-2026").unwrap(),
        CaseMetadata::default(),
    )
    .unwrap()
}

fn record(state: VerificationState, holder: UserId) -> VerificationRecord {
    let mut r = VerificationRecord::not_verified(
        AuditCaseId::new("case_p").unwrap(),
        QuarterKey::parse("Q1-2026").unwrap(),
    );
    if state != VerificationState::NotVerified {
        r.state = state;
        r.verifier_id = Some(holder);
        r.fields = Some(VerificationFields::default());
        r.is_completed = state == VerificationState::Verified;
    }
    r
}

proptest! {
    #[test]
    fn inactive_readers_unknown_and_finalized_always_deny(
        role in arb_role(),
        active in any::<bool>(),
        state in arb_state(),
        actor in arb_id(),
        owner in arb_id(),
        holder in arb_id(),
    ) {
        let u = user(actor, role, active);
        let allowed = can_verify(&u, &case(Some(owner)), &record(state, holder));
        if !active
            || matches!(role, UserRole::Reader | UserRole::Unknown)
            || state == VerificationState::Verified
        {
            prop_assert!(!allowed);
        }
    }

    #[test]
    fn team_leader_never_starts_own_case(actor in arb_id()) {
        let tl = user(actor.clone(), UserRole::TeamLeader, true);
        let r = record(VerificationState::NotVerified, actor.clone());
        prop_assert!(!can_verify(&tl, &case(Some(actor)), &r));
    }

    #[test]
    fn seniors_start_other_users_cases(
        senior in prop_oneof![Just(UserRole::Specialist), Just(UserRole::TeamLeader)],
        actor in arb_id(),
        owner in arb_id(),
    ) {
        prop_assume!(actor != owner);
        let u = user(actor.clone(), senior, true);
        let r = record(VerificationState::NotVerified, actor);
        prop_assert!(can_verify(&u, &case(Some(owner)), &r));
    }

    #[test]
    fn staff_never_starts_nor_takes_over(
        actor in arb_id(),
        owner in arb_id(),
        holder in arb_id(),
    ) {
        let staff = user(actor.clone(), UserRole::Staff, true);
        let c = case(Some(owner));
        prop_assert!(!can_verify(&staff, &c, &record(VerificationState::NotVerified, holder.clone())));
        let in_progress = record(VerificationState::InProgress, holder.clone());
        prop_assert_eq!(can_verify(&staff, &c, &in_progress), holder == actor);
    }

    #[test]
    fn decision_is_a_pure_function(
        role in arb_role(),
        state in arb_state(),
        actor in arb_id(),
        holder in arb_id(),
    ) {
        let u = user(actor, role, true);
        let c = case(None);
        let r = record(state, holder);
        prop_assert_eq!(decide(&u, &c, &r), decide(&u, &c, &r));
    }
}
