#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{validate_text, validate_token};
use crate::quarter::QuarterKey;
use crate::roster::UserId;
use crate::{ContractViolation, Validate};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditCaseId(String);

impl AuditCaseId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for AuditCaseId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_token("audit_case_id", &self.0, 96)
    }
}

impl fmt::Display for AuditCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Descriptive case data carried through from the case-management system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseMetadata {
    pub client_name: String,
    pub policy_number: String,
    #[serde(default)]
    pub product_line: Option<String>,
}

impl Validate for CaseMetadata {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("case_metadata.client_name", &self.client_name, 256)?;
        validate_text("case_metadata.policy_number", &self.policy_number, 64)?;
        if let Some(line) = &self.product_line {
            validate_text("case_metadata.product_line", line, 64)?;
        }
        Ok(())
    }
}

/// A case under review. Read-only to this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditCase {
    pub id: AuditCaseId,
    /// The original handler whose work is being reviewed. `None` for filler cases.
    pub owning_user_id: Option<UserId>,
    pub coverage_amount: u64,
    pub quarter_key: QuarterKey,
    #[serde(default)]
    pub metadata: CaseMetadata,
}

impl AuditCase {
    pub fn v1(
        id: AuditCaseId,
        owning_user_id: Option<UserId>,
        coverage_amount: u64,
        quarter_key: QuarterKey,
        metadata: CaseMetadata,
    ) -> Result<Self, ContractViolation> {
        let case = Self {
            id,
            owning_user_id,
            coverage_amount,
            quarter_key,
            metadata,
        };
        case.validate()?;
        Ok(case)
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        self.owning_user_id.as_ref() == Some(user_id)
    }
}

impl Validate for AuditCase {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.id.validate()?;
        if let Some(owner) = &self.owning_user_id {
            owner.validate()?;
        }
        self.quarter_key.validate()?;
        self.metadata.validate()
    }
}
