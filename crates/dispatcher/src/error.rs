//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Delivery target could not be built from configuration
    #[error("failed to create delivery '{name}': {message}")]
    DeliveryCreation { name: String, message: String },

    /// At least one tenant's batches were not all delivered in a flush cycle
    #[error("delivery failed for tenants {tenants:?}; undelivered records were requeued")]
    DeliveryFailed { tenants: Vec<String> },
}

impl DispatcherError {
    /// Create a delivery creation error
    pub fn delivery_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DeliveryCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
