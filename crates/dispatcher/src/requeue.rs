//! RequeueManager - returns undelivered records to the front of their queue

use std::sync::Arc;

use buffer::QueueRegistry;
use contracts::{Record, TenantKey};
use tracing::{instrument, warn};

use crate::metrics::PipelineMetrics;

/// Restores the unsent suffix of a tenant's snapshot after a failed batch
#[derive(Debug, Clone)]
pub struct RequeueManager {
    registry: Arc<QueueRegistry>,
    metrics: Arc<PipelineMetrics>,
}

impl RequeueManager {
    pub fn new(registry: Arc<QueueRegistry>, metrics: Arc<PipelineMetrics>) -> Self {
        Self { registry, metrics }
    }

    /// Requeue `records[first_unsent..]` ahead of anything queued since the
    /// snapshot. Returns the number of records put back.
    #[instrument(
        name = "requeue_records",
        skip(self, records),
        fields(tenant = %tenant)
    )]
    pub async fn requeue(&self, tenant: &TenantKey, records: &[Record], first_unsent: usize) -> usize {
        let Some(unsent) = records.get(first_unsent..) else {
            return 0;
        };
        if unsent.is_empty() {
            return 0;
        }

        let count = unsent.len();
        self.registry.requeue(tenant.clone(), unsent.to_vec()).await;
        self.metrics.add_requeued(count);
        observability::record_requeued(tenant, count);

        warn!(
            tenant = %tenant,
            requeued = count,
            "Undelivered records requeued"
        );
        count
    }
}
