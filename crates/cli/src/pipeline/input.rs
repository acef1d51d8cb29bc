//! NDJSON submission lines

use contracts::{Record, TenantKey};
use serde::Deserialize;
use serde_json::Value;

use crate::error::CliError;

/// One input line: `{"tenant_id", "actor_id", "external_id"?, "record"}`
#[derive(Debug, Clone, Deserialize)]
pub struct Submission {
    pub tenant_id: String,
    pub actor_id: String,
    #[serde(default)]
    pub external_id: Option<String>,
    pub record: Value,
}

impl Submission {
    /// Parse a line; `line` is one-based and only used in errors
    pub fn parse(text: &str, line: usize) -> Result<Self, CliError> {
        let submission: Self = serde_json::from_str(text)
            .map_err(|e| CliError::invalid_submission(line, e.to_string()))?;

        if submission.tenant_id.trim().is_empty() {
            return Err(CliError::invalid_submission(line, "tenant_id is empty"));
        }
        if submission.actor_id.trim().is_empty() {
            return Err(CliError::invalid_submission(line, "actor_id is empty"));
        }
        Ok(submission)
    }

    pub fn into_parts(self) -> (TenantKey, Record) {
        let tenant = TenantKey::new(self.tenant_id, self.actor_id);
        let record = Record {
            // Blank ids are treated as absent rather than as a shared dedup key
            external_id: self.external_id.filter(|id| !id.trim().is_empty()),
            payload: self.record,
        };
        (tenant, record)
    }
}
