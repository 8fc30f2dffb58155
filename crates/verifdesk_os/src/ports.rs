#![forbid(unsafe_code)]

use serde_json::Value;
use verifdesk_kernel_contracts::case::{AuditCase, AuditCaseId};
use verifdesk_kernel_contracts::completion::CompletionPayload;
use verifdesk_kernel_contracts::quarter::QuarterKey;
use verifdesk_kernel_contracts::roster::User;
use verifdesk_kernel_contracts::verification::VerificationError;
use verifdesk_kernel_contracts::Validate;

pub const CASE_SOURCE_NAME: &str = "fetchAuditsByQuarter";

/// Case-management boundary.
///
/// Never fails into the caller: transport problems come back as a non-list
/// payload (typically `Value::Null`), which [`decode_case_list`] turns into
/// `DataUnavailable`.
pub trait CaseSource {
    fn fetch_audits_by_quarter(&self, quarter_key: &QuarterKey) -> Value;
}

/// Reporting boundary. Delivery is at-least-once; retries belong to the caller.
pub trait CompletionSink {
    fn submit_completion(
        &self,
        case_id: &AuditCaseId,
        payload: &CompletionPayload,
    ) -> anyhow::Result<()>;
}

pub trait RosterSource {
    fn current_users(&self) -> anyhow::Result<Vec<User>>;
}

/// Sink for deployments that report completions elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCompletionSink;

impl CompletionSink for NoopCompletionSink {
    fn submit_completion(
        &self,
        _case_id: &AuditCaseId,
        _payload: &CompletionPayload,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Case source with no data at all, e.g. when running selection offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCaseSource;

impl CaseSource for EmptyCaseSource {
    fn fetch_audits_by_quarter(&self, _quarter_key: &QuarterKey) -> Value {
        Value::Array(Vec::new())
    }
}

pub fn decode_case_list(raw: Value) -> Result<Vec<AuditCase>, VerificationError> {
    let Value::Array(_) = raw else {
        return Err(VerificationError::DataUnavailable {
            source_name: CASE_SOURCE_NAME,
            detail: format!("expected a list, got {}", json_kind(&raw)),
        });
    };
    let cases: Vec<AuditCase> =
        serde_json::from_value(raw).map_err(|err| VerificationError::DataUnavailable {
            source_name: CASE_SOURCE_NAME,
            detail: err.to_string(),
        })?;
    for case in &cases {
        case.validate()
            .map_err(|violation| VerificationError::DataUnavailable {
                source_name: CASE_SOURCE_NAME,
                detail: violation.to_string(),
            })?;
    }
    Ok(cases)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}
