//! Delivery trait - downstream batch transport
//!
//! The buffer only needs success or failure plus enough metadata to log and
//! decide on requeue. Everything else about the transport stays behind this
//! trait.

use std::fmt;
use std::sync::Arc;

use crate::{ContractError, Record, TenantKey};

/// One bounded, ordered slice of a tenant's snapshotted records
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// Owner of every record in the batch
    pub tenant: &'a TenantKey,
    /// Records in arrival order
    pub records: &'a [Record],
    /// Zero-based position of this batch within the tenant's flush
    pub index: usize,
    /// Number of batches the tenant's flush was split into
    pub total: usize,
}

impl Batch<'_> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 >= self.total
    }
}

impl fmt::Display for Batch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch {}/{} for {} ({} records)",
            self.index + 1,
            self.total,
            self.tenant,
            self.records.len()
        )
    }
}

/// Response metadata of a successful delivery
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Status code reported by the remote side, if any
    pub status: Option<u16>,
    /// Free-form detail for logs
    pub detail: Option<String>,
}

impl DeliveryReceipt {
    pub fn with_status(status: u16) -> Self {
        Self {
            status: Some(status),
            detail: None,
        }
    }
}

/// Batch delivery trait
///
/// Implementations must be safe to call concurrently for different tenants;
/// the dispatcher never calls them concurrently for the same tenant.
#[trait_variant::make(Delivery: Send)]
pub trait LocalDelivery {
    /// Target name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Persist one batch downstream
    ///
    /// # Errors
    /// Any error marks the batch as failed; it is requeued together with the
    /// tenant's remaining batches.
    async fn deliver(&self, batch: Batch<'_>) -> Result<DeliveryReceipt, ContractError>;
}

impl<T> Delivery for Arc<T>
where
    T: Delivery + Sync,
{
    fn name(&self) -> &str {
        Delivery::name(&**self)
    }

    async fn deliver(&self, batch: Batch<'_>) -> Result<DeliveryReceipt, ContractError> {
        Delivery::deliver(&**self, batch).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_batch_display_is_one_based() {
        let tenant = TenantKey::new("t", "a");
        let records = vec![Record::new(json!(1)), Record::new(json!(2))];
        let batch = Batch {
            tenant: &tenant,
            records: &records,
            index: 1,
            total: 3,
        };

        assert_eq!(batch.to_string(), "batch 2/3 for t/a (2 records)");
        assert!(!batch.is_last());
        assert_eq!(batch.len(), 2);
    }
}
