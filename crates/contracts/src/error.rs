//! Layered error definitions
//!
//! Categorized by source: config / delivery / general

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Delivery Errors =====
    /// Remote side answered with a non-success status
    #[error("delivery '{target}' rejected batch with status {status}: {body}")]
    DeliveryRejected {
        target: String,
        status: u16,
        body: String,
    },

    /// No response: connection, TLS, encoding or local write failure
    #[error("delivery '{target}' transport error: {message}")]
    DeliveryTransport { target: String, message: String },

    /// Delivery did not complete within the configured bound
    #[error("delivery '{target}' timed out after {timeout_ms}ms")]
    DeliveryTimeout { target: String, timeout_ms: u64 },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create delivery rejection error
    pub fn delivery_rejected(target: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self::DeliveryRejected {
            target: target.into(),
            status,
            body: body.into(),
        }
    }

    /// Create delivery transport error
    pub fn delivery_transport(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeliveryTransport {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Status code of a rejected delivery; `None` when no response was received
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::DeliveryRejected { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short label used as a metrics dimension
    pub fn reason(&self) -> &'static str {
        match self {
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } => "config",
            Self::DeliveryRejected { .. } => "rejected",
            Self::DeliveryTransport { .. } => "transport",
            Self::DeliveryTimeout { .. } => "timeout",
            Self::Io(_) => "io",
            Self::Other(_) => "other",
        }
    }
}
