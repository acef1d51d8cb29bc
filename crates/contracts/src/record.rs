//! Record - normalized payload accepted by the buffer

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A normalized record awaiting delivery.
///
/// The payload is opaque to the pipeline. `external_id` (e.g. a canonical
/// profile URL) is the only field the buffer inspects, for deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Deduplication key, unique per tenant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Normalized payload forwarded downstream untouched
    pub payload: Value,
}

impl Record {
    pub fn new(payload: Value) -> Self {
        Self {
            external_id: None,
            payload,
        }
    }

    pub fn with_external_id(payload: Value, external_id: impl Into<String>) -> Self {
        Self {
            external_id: Some(external_id.into()),
            payload,
        }
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }
}

/// Result of handing a record to the buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    /// Record was queued
    Accepted,
    /// `(tenant_id, external_id)` was already accepted earlier; record ignored
    Duplicate,
}

impl SubmitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Duplicate => "duplicate",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_without_external_id_omits_field() {
        let record = Record::new(json!({"name": "Ada"}));
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"payload":{"name":"Ada"}}"#);
    }

    #[test]
    fn test_record_deserialize_with_external_id() {
        let record: Record = serde_json::from_str(
            r#"{"external_id":"https://linkedin.com/in/ada","payload":{"name":"Ada"}}"#,
        )
        .unwrap();
        assert_eq!(record.external_id(), Some("https://linkedin.com/in/ada"));
    }

    #[test]
    fn test_submit_status_serde() {
        assert_eq!(
            serde_json::to_string(&SubmitStatus::Duplicate).unwrap(),
            "\"duplicate\""
        );
        assert_eq!(SubmitStatus::Accepted.as_str(), "accepted");
    }
}
