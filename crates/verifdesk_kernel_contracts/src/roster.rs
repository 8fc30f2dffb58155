#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{validate_text, validate_token};
use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for UserId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token("user_id", &self.0, 64)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Staff,
    Specialist,
    TeamLeader,
    Reader,
    /// Any role string the roster source sends that this core does not know.
    #[serde(other)]
    Unknown,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Staff => "STAFF",
            UserRole::Specialist => "SPECIALIST",
            UserRole::TeamLeader => "TEAM_LEADER",
            UserRole::Reader => "READER",
            UserRole::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(raw: &str) -> Self {
        match raw {
            "STAFF" => UserRole::Staff,
            "SPECIALIST" => UserRole::Specialist,
            "TEAM_LEADER" => UserRole::TeamLeader,
            "READER" => UserRole::Reader,
            _ => UserRole::Unknown,
        }
    }

    /// Every role except `READER`, unrecognised ones included.
    pub fn carries_audit_work(self) -> bool {
        self != UserRole::Reader
    }
}

/// One roster entry. Immutable for the duration of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
}

impl User {
    pub fn v1(
        id: UserId,
        name: impl Into<String>,
        role: UserRole,
        is_active: bool,
    ) -> Result<Self, ContractViolation> {
        let user = Self {
            id,
            name: name.into(),
            role,
            is_active,
        };
        user.validate()?;
        Ok(user)
    }

    /// Active and not a reader.
    pub fn is_selection_eligible(&self) -> bool {
        self.is_active && self.role.carries_audit_work()
    }
}

impl Validate for User {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.id.validate()?;
        if self.name.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "user.name",
                reason: "must not be empty",
            });
        }
        validate_text("user.name", &self.name, 128)
    }
}
