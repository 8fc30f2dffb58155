#![forbid(unsafe_code)]

use chrono::{DateTime, Utc};
use log::{debug, info};
use verifdesk_engines::access::VerificationPolicy;
use verifdesk_kernel_contracts::case::AuditCaseId;
use verifdesk_kernel_contracts::roster::{User, UserId};
use verifdesk_kernel_contracts::verification::{
    DraftPatch, PermittedActions, RecordToken, VerificationError, VerificationRecord,
};
use verifdesk_kernel_contracts::{ContractViolation, Validate};
use verifdesk_storage::repo::VerificationRepo;

use crate::ports::{CompletionSink, RosterSource};
use crate::verification_wiring::VerificationWiring;

pub const ROSTER_SOURCE_NAME: &str = "currentUsers";

/// One client session: a roster, the acting identity, and the shared wiring.
///
/// Switching identity only changes whose permissions are computed next; it
/// never touches a record.
#[derive(Debug)]
pub struct AuditSession<P, R, S>
where
    P: VerificationPolicy,
    R: VerificationRepo,
    S: CompletionSink,
{
    wiring: VerificationWiring<P, R, S>,
    roster: Vec<User>,
    acting: User,
}

impl<P, R, S> AuditSession<P, R, S>
where
    P: VerificationPolicy,
    R: VerificationRepo,
    S: CompletionSink,
{
    pub fn new(
        wiring: VerificationWiring<P, R, S>,
        roster: Vec<User>,
        acting_user_id: &UserId,
    ) -> Result<Self, ContractViolation> {
        for user in &roster {
            user.validate()?;
        }
        let acting = find(&roster, acting_user_id)?.clone();
        Ok(Self {
            wiring,
            roster,
            acting,
        })
    }

    pub fn acting_user(&self) -> &User {
        &self.acting
    }

    pub fn roster(&self) -> &[User] {
        &self.roster
    }

    pub fn wiring(&self) -> &VerificationWiring<P, R, S> {
        &self.wiring
    }

    pub fn wiring_mut(&mut self) -> &mut VerificationWiring<P, R, S> {
        &mut self.wiring
    }

    pub fn switch_user(&mut self, user_id: &UserId) -> Result<&User, ContractViolation> {
        self.acting = find(&self.roster, user_id)?.clone();
        debug!("acting user is now {} ({})", self.acting.id, self.acting.role.as_str());
        Ok(&self.acting)
    }

    /// Replaces the roster. A role or activity change of the acting user
    /// applies to the very next action.
    pub fn refresh_roster<Src: RosterSource>(
        &mut self,
        source: &Src,
    ) -> Result<usize, VerificationError> {
        let users = source
            .current_users()
            .map_err(|err| VerificationError::DataUnavailable {
                source_name: ROSTER_SOURCE_NAME,
                detail: format!("{err:#}"),
            })?;
        for user in &users {
            user.validate()?;
        }
        let acting = find(&users, &self.acting.id)?.clone();
        self.acting = acting;
        self.roster = users;
        info!("roster refreshed: {} users", self.roster.len());
        Ok(self.roster.len())
    }

    pub fn start_or_resume(
        &mut self,
        case_id: &AuditCaseId,
        observed: &RecordToken,
        now: DateTime<Utc>,
    ) -> Result<VerificationRecord, VerificationError> {
        self.wiring
            .start_or_resume(&self.acting, case_id, observed, now)
    }

    pub fn save_draft(
        &mut self,
        case_id: &AuditCaseId,
        observed: &RecordToken,
        patch: DraftPatch,
        now: DateTime<Utc>,
    ) -> Result<VerificationRecord, VerificationError> {
        self.wiring
            .save_draft(&self.acting, case_id, observed, patch, now)
    }

    pub fn finalize(
        &mut self,
        case_id: &AuditCaseId,
        observed: &RecordToken,
        patch: DraftPatch,
        now: DateTime<Utc>,
    ) -> Result<VerificationRecord, VerificationError> {
        self.wiring
            .finalize(&self.acting, case_id, observed, patch, now)
    }

    pub fn permitted_actions(
        &self,
        case_id: &AuditCaseId,
    ) -> Result<PermittedActions, VerificationError> {
        self.wiring.permitted_actions(&self.acting, case_id)
    }
}

fn find<'a>(roster: &'a [User], user_id: &UserId) -> Result<&'a User, ContractViolation> {
    roster
        .iter()
        .find(|u| &u.id == user_id)
        .ok_or(ContractViolation::InvalidValue {
            field: "audit_session.acting_user_id",
            reason: "must be present in the roster",
        })
}
