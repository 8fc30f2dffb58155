#![forbid(unsafe_code)]

//! Property tests for auto-selection cardinality, uniqueness and amount bounds.

use std::collections::BTreeSet;

use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

use verifdesk_engines::access::coverage_limit;
use verifdesk_engines::selection::{AutoSelection, SelectionConfig};
use verifdesk_kernel_contracts::quarter::Quarter;
use verifdesk_kernel_contracts::roster::{User, UserId, UserRole};
use verifdesk_kernel_contracts::selection::{SelectionOrigin, PREVIOUS_QUARTER_RANDOM_COUNT};

fn arb_role() -> impl Strategy<Value = UserRole> {
    prop_oneof![
        Just(UserRole::Staff),
        Just(UserRole::Specialist),
        Just(UserRole::TeamLeader),
        Just(UserRole::Reader),
        Just(UserRole::Unknown),
    ]
}

fn arb_roster() -> impl Strategy<Value = Vec<User>> {
    prop::collection::vec((arb_role(), any::<bool>()), 0..40).prop_map(|entries| {
        entries
            .into_iter()
            .enumerate()
            .map(|(i, (role, active))| {
                User::v1(
                    UserId::new(format!("u_{i}")).unwrap(),
                    format!("User {i}"),
                    role,
                    active,
                )
                .unwrap()
            })
            .collect()
    })
}

fn arb_quarter() -> impl Strategy<Value = Quarter> {
    (1u8..=4, 2000i32..=2100).prop_map(|(n, y)| Quarter::v1(n, y).unwrap())
}

fn engine() -> AutoSelection {
    AutoSelection::new(SelectionConfig::mvp_v1()).unwrap()
}

proptest! {
    #[test]
    fn candidate_count_is_eligible_plus_two(
        roster in arb_roster(),
        quarter in arb_quarter(),
        seed in any::<u64>(),
    ) {
        let eligible = roster
            .iter()
            .filter(|u| u.is_active && u.role != UserRole::Reader)
            .count();
        let mut rng = StdRng::seed_from_u64(seed);
        let out = engine().run(&roster, &[], quarter, &mut rng).unwrap();
        prop_assert_eq!(out.len(), eligible + 2);
        prop_assert_eq!(out.count_by_origin(SelectionOrigin::CurrentQuarterUser), eligible);
        prop_assert_eq!(
            out.count_by_origin(SelectionOrigin::PreviousQuarterRandom),
            PREVIOUS_QUARTER_RANDOM_COUNT
        );
    }

    #[test]
    fn candidate_ids_are_pairwise_unique(
        roster in arb_roster(),
        quarter in arb_quarter(),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let out = engine().run(&roster, &[], quarter, &mut rng).unwrap();
        let ids: BTreeSet<&str> = out.cases().map(|c| c.id.as_str()).collect();
        prop_assert_eq!(ids.len(), out.len());
    }

    #[test]
    fn amounts_stay_inside_their_bands(
        roster in arb_roster(),
        quarter in arb_quarter(),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let out = engine().run(&roster, &[], quarter, &mut rng).unwrap();
        for c in &out.candidates {
            match c.origin {
                SelectionOrigin::PreviousQuarterRandom => {
                    prop_assert!((5_000..=105_000).contains(&c.case.coverage_amount));
                }
                SelectionOrigin::CurrentQuarterUser => {
                    let owner = c.case.owning_user_id.as_ref().unwrap();
                    let user = roster.iter().find(|u| &u.id == owner).unwrap();
                    let upper = coverage_limit(user.role) * 80 / 100;
                    if upper <= 1_000 {
                        prop_assert_eq!(c.case.coverage_amount, 1_000);
                    } else {
                        prop_assert!(c.case.coverage_amount >= 1_000);
                        prop_assert!(c.case.coverage_amount < upper);
                    }
                }
            }
        }
    }

    #[test]
    fn rerunning_never_accumulates(
        roster in arb_roster(),
        quarter in arb_quarter(),
        seed in any::<u64>(),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let first = engine().run(&roster, &[], quarter, &mut rng).unwrap();
        let second = engine().run(&roster, &[], quarter, &mut rng).unwrap();
        prop_assert_eq!(first.len(), second.len());
        let first_ids: Vec<&str> = first.cases().map(|c| c.id.as_str()).collect();
        let second_ids: Vec<&str> = second.cases().map(|c| c.id.as_str()).collect();
        prop_assert_eq!(first_ids, second_ids);
    }
}
