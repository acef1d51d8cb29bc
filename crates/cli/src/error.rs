//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// An input line is not a valid submission
    #[error("Invalid submission on line {line}: {message}")]
    InvalidSubmission { line: usize, message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn invalid_submission(line: usize, message: impl Into<String>) -> Self {
        Self::InvalidSubmission {
            line,
            message: message.into(),
        }
    }
}
