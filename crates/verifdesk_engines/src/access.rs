#![forbid(unsafe_code)]

use verifdesk_kernel_contracts::case::AuditCase;
use verifdesk_kernel_contracts::roster::{User, UserRole};
use verifdesk_kernel_contracts::verification::{
    PermittedActions, VerificationRecord, VerificationState,
};
use verifdesk_kernel_contracts::ReasonCodeId;

pub mod reason_codes {
    use verifdesk_kernel_contracts::ReasonCodeId;

    // Access-control reason-code namespace ("AC").
    pub const ACCESS_RESUME_OWN: ReasonCodeId = ReasonCodeId(0x4143_0001);
    pub const ACCESS_ESCALATION_TAKEOVER: ReasonCodeId = ReasonCodeId(0x4143_0002);
    pub const ACCESS_INITIATE: ReasonCodeId = ReasonCodeId(0x4143_0003);

    pub const ACCESS_USER_INACTIVE: ReasonCodeId = ReasonCodeId(0x4143_00F1);
    pub const ACCESS_READER_ROLE: ReasonCodeId = ReasonCodeId(0x4143_00F2);
    pub const ACCESS_RECORD_FINALIZED: ReasonCodeId = ReasonCodeId(0x4143_00F3);
    pub const ACCESS_STAFF_TAKEOVER_BLOCKED: ReasonCodeId = ReasonCodeId(0x4143_00F4);
    pub const ACCESS_FOUR_EYES: ReasonCodeId = ReasonCodeId(0x4143_00F5);
    pub const ACCESS_STAFF_INITIATE_BLOCKED: ReasonCodeId = ReasonCodeId(0x4143_00F6);
    pub const ACCESS_UNKNOWN_ROLE: ReasonCodeId = ReasonCodeId(0x4143_00F7);
    pub const ACCESS_NOT_DRAFT_HOLDER: ReasonCodeId = ReasonCodeId(0x4143_00F8);
}

pub const STAFF_COVERAGE_LIMIT: u64 = 30_000;
pub const SENIOR_COVERAGE_LIMIT: u64 = 150_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub reason_code: ReasonCodeId,
}

impl AccessDecision {
    fn allow(reason_code: ReasonCodeId) -> Self {
        Self {
            allowed: true,
            reason_code,
        }
    }

    fn deny(reason_code: ReasonCodeId) -> Self {
        Self {
            allowed: false,
            reason_code,
        }
    }

    pub fn message(&self) -> &'static str {
        reason_message(self.reason_code)
    }
}

/// Seam for the lifecycle engine; every transition asks the policy afresh.
pub trait VerificationPolicy {
    fn decide(&self, user: &User, case: &AuditCase, record: &VerificationRecord)
        -> AccessDecision;

    fn can_verify(&self, user: &User, case: &AuditCase, record: &VerificationRecord) -> bool {
        self.decide(user, case, record).allowed
    }
}

/// The four-eyes verification policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FourEyesPolicy;

impl VerificationPolicy for FourEyesPolicy {
    fn decide(
        &self,
        user: &User,
        case: &AuditCase,
        record: &VerificationRecord,
    ) -> AccessDecision {
        decide(user, case, record)
    }
}

/// Rules are checked in priority order; the first one that fires wins.
pub fn decide(user: &User, case: &AuditCase, record: &VerificationRecord) -> AccessDecision {
    if !user.is_active {
        return AccessDecision::deny(reason_codes::ACCESS_USER_INACTIVE);
    }
    match user.role {
        UserRole::Reader => return AccessDecision::deny(reason_codes::ACCESS_READER_ROLE),
        UserRole::Unknown => return AccessDecision::deny(reason_codes::ACCESS_UNKNOWN_ROLE),
        UserRole::Staff | UserRole::Specialist | UserRole::TeamLeader => {}
    }

    match record.state {
        VerificationState::Verified => AccessDecision::deny(reason_codes::ACCESS_RECORD_FINALIZED),
        VerificationState::InProgress => {
            if record.is_held_by(&user.id) {
                AccessDecision::allow(reason_codes::ACCESS_RESUME_OWN)
            } else if user.role == UserRole::Staff {
                AccessDecision::deny(reason_codes::ACCESS_STAFF_TAKEOVER_BLOCKED)
            } else {
                AccessDecision::allow(reason_codes::ACCESS_ESCALATION_TAKEOVER)
            }
        }
        VerificationState::NotVerified => match user.role {
            UserRole::TeamLeader if case.is_owned_by(&user.id) => {
                AccessDecision::deny(reason_codes::ACCESS_FOUR_EYES)
            }
            UserRole::TeamLeader | UserRole::Specialist => {
                AccessDecision::allow(reason_codes::ACCESS_INITIATE)
            }
            _ => AccessDecision::deny(reason_codes::ACCESS_STAFF_INITIATE_BLOCKED),
        },
    }
}

pub fn can_verify(user: &User, case: &AuditCase, record: &VerificationRecord) -> bool {
    decide(user, case, record).allowed
}

/// Draft edits need the policy to allow the user *and* the user to hold the draft.
pub fn decide_draft_edit<P: VerificationPolicy + ?Sized>(
    policy: &P,
    user: &User,
    case: &AuditCase,
    record: &VerificationRecord,
) -> AccessDecision {
    let decision = policy.decide(user, case, record);
    if !decision.allowed {
        return decision;
    }
    if record.state != VerificationState::InProgress || !record.is_held_by(&user.id) {
        return AccessDecision::deny(reason_codes::ACCESS_NOT_DRAFT_HOLDER);
    }
    decision
}

/// Upper bound for synthetic sample amounts. Not an authorization check.
pub fn coverage_limit(role: UserRole) -> u64 {
    match role {
        UserRole::Staff => STAFF_COVERAGE_LIMIT,
        UserRole::Specialist | UserRole::TeamLeader => SENIOR_COVERAGE_LIMIT,
        UserRole::Reader | UserRole::Unknown => 0,
    }
}

pub fn permitted_actions<P: VerificationPolicy + ?Sized>(
    policy: &P,
    user: &User,
    case: &AuditCase,
    record: &VerificationRecord,
) -> PermittedActions {
    let verify = policy.can_verify(user, case, record);
    PermittedActions {
        view: user.is_active,
        start_or_resume: verify && record.state != VerificationState::Verified,
        save_draft: decide_draft_edit(policy, user, case, record).allowed,
        finalize: verify,
    }
}

pub fn reason_message(code: ReasonCodeId) -> &'static str {
    match code {
        reason_codes::ACCESS_RESUME_OWN => "verifier resumes their own in-progress review",
        reason_codes::ACCESS_ESCALATION_TAKEOVER => "review taken over by escalation",
        reason_codes::ACCESS_INITIATE => "review may be started",
        reason_codes::ACCESS_USER_INACTIVE => "user is inactive",
        reason_codes::ACCESS_READER_ROLE => "readers cannot act as auditors",
        reason_codes::ACCESS_RECORD_FINALIZED => "verification is already finalized",
        reason_codes::ACCESS_STAFF_TAKEOVER_BLOCKED => {
            "staff cannot take over another user's review"
        }
        reason_codes::ACCESS_FOUR_EYES => "team leaders cannot review their own cases",
        reason_codes::ACCESS_STAFF_INITIATE_BLOCKED => "staff cannot start new reviews",
        reason_codes::ACCESS_UNKNOWN_ROLE => "role is not recognized",
        reason_codes::ACCESS_NOT_DRAFT_HOLDER => "user does not hold the in-progress draft",
        _ => "access denied",
    }
}
