//! BatchDispatcher - turns a snapshot into ordered per-tenant batches
//!
//! Tenants are sent concurrently, one task each. Within a tenant, batches go
//! out strictly in order, separated by the configured wait interval; the first
//! failure stops that tenant and hands the unsent suffix to the requeue
//! manager.

use std::sync::Arc;
use std::time::Duration;

use buffer::Snapshot;
use contracts::{Batch, BatchingConfig, ContractError, Delivery, DeliveryReceipt, Record, TenantKey};
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::metrics::PipelineMetrics;
use crate::report::{TenantOutcome, TenantReport};
use crate::requeue::RequeueManager;

/// Failure reason recorded when a tenant task dies before reporting
const TASK_FAILED: &str = "task_failed";

/// Batching knobs used while sending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Maximum records per downstream call, at least 1
    pub batch_size: usize,
    /// Pause between consecutive batches of one tenant
    pub wait_interval: Duration,
    /// Upper bound on a single downstream call
    pub delivery_timeout: Duration,
}

impl DispatchSettings {
    pub fn from_config(config: &BatchingConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            wait_interval: config.wait_interval(),
            delivery_timeout: config.delivery_timeout(),
        }
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from_config(&BatchingConfig::default())
    }
}

/// Sends snapshots through a [`Delivery`] target
pub struct BatchDispatcher<D> {
    delivery: Arc<D>,
    requeue: RequeueManager,
    metrics: Arc<PipelineMetrics>,
    settings: DispatchSettings,
}

impl<D> Clone for BatchDispatcher<D> {
    fn clone(&self) -> Self {
        Self {
            delivery: Arc::clone(&self.delivery),
            requeue: self.requeue.clone(),
            metrics: Arc::clone(&self.metrics),
            settings: self.settings,
        }
    }
}

impl<D> BatchDispatcher<D>
where
    D: Delivery + Sync + 'static,
{
    pub fn new(
        delivery: Arc<D>,
        requeue: RequeueManager,
        metrics: Arc<PipelineMetrics>,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            delivery,
            requeue,
            metrics,
            settings: DispatchSettings {
                batch_size: settings.batch_size.max(1),
                ..settings
            },
        }
    }

    pub fn settings(&self) -> DispatchSettings {
        self.settings
    }

    /// Send every tenant of `snapshot` and collect one report per tenant.
    ///
    /// A tenant task that dies without reporting gets its whole share
    /// requeued.
    #[instrument(
        name = "dispatcher_dispatch",
        skip(self, snapshot),
        fields(
            tenants = snapshot.tenant_count(),
            records = snapshot.record_count()
        )
    )]
    pub async fn dispatch(&self, snapshot: Snapshot) -> Vec<TenantReport> {
        let mut workers = Vec::with_capacity(snapshot.tenant_count());

        for (tenant, records) in snapshot {
            let records = Arc::new(records);
            let worker = self.clone();
            let task_tenant = tenant.clone();
            let task_records = Arc::clone(&records);
            let handle =
                tokio::spawn(async move { worker.send_tenant(task_tenant, task_records).await });
            workers.push((tenant, records, handle));
        }

        let mut reports = Vec::with_capacity(workers.len());
        for (tenant, records, handle) in workers {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(tenant = %tenant, error = %e, "Delivery task failed");
                    observability::record_batch_failed(&tenant, TASK_FAILED, 0.0);
                    let requeued = self.requeue.requeue(&tenant, &records, 0).await;
                    self.metrics.inc_batch_failed(TASK_FAILED, requeued, 0.0);
                    reports.push(TenantReport {
                        tenant,
                        outcome: TenantOutcome::Failed {
                            delivered_batches: 0,
                            delivered_records: 0,
                            failed_batch: 0,
                            total_batches: records.len().div_ceil(self.settings.batch_size),
                            requeued,
                            status: None,
                            error: format!("delivery task failed: {e}"),
                        },
                    });
                }
            }
        }
        reports
    }

    /// Send one tenant's records in order, stopping at the first failure
    #[instrument(
        name = "dispatcher_send_tenant",
        skip(self, records),
        fields(tenant = %tenant, records = records.len())
    )]
    async fn send_tenant(&self, tenant: TenantKey, records: Arc<Vec<Record>>) -> TenantReport {
        let size = self.settings.batch_size;
        let total = records.len().div_ceil(size);
        let mut delivered_records = 0;

        for (index, chunk) in records.chunks(size).enumerate() {
            let batch = Batch {
                tenant: &tenant,
                records: chunk,
                index,
                total,
            };
            let started = Instant::now();

            match self.deliver_one(batch).await {
                Ok(receipt) => {
                    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                    self.metrics.inc_batch_delivered(chunk.len(), latency_ms);
                    observability::record_batch_delivered(&tenant, chunk.len(), latency_ms);
                    debug!(
                        %batch,
                        status = ?receipt.status,
                        latency_ms,
                        "Batch delivered"
                    );
                    delivered_records += chunk.len();

                    if index + 1 < total && !self.settings.wait_interval.is_zero() {
                        tokio::time::sleep(self.settings.wait_interval).await;
                    }
                }
                Err(err) => {
                    let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                    observability::record_batch_failed(&tenant, err.reason(), latency_ms);
                    error!(
                        %batch,
                        status = ?err.status(),
                        error = %err,
                        "Batch delivery failed"
                    );

                    let requeued = self.requeue.requeue(&tenant, &records, index * size).await;
                    self.metrics
                        .inc_batch_failed(err.reason(), requeued, latency_ms);
                    return TenantReport {
                        tenant,
                        outcome: TenantOutcome::Failed {
                            delivered_batches: index,
                            delivered_records,
                            failed_batch: index,
                            total_batches: total,
                            requeued,
                            status: err.status(),
                            error: err.to_string(),
                        },
                    };
                }
            }
        }

        info!(
            tenant = %tenant,
            batches = total,
            records = delivered_records,
            "Tenant delivered"
        );
        TenantReport {
            tenant,
            outcome: TenantOutcome::Delivered {
                batches: total,
                records: delivered_records,
            },
        }
    }

    async fn deliver_one(&self, batch: Batch<'_>) -> Result<DeliveryReceipt, ContractError> {
        let timeout = self.settings.delivery_timeout;
        match tokio::time::timeout(timeout, self.delivery.deliver(batch)).await {
            Ok(result) => result,
            Err(_) => Err(ContractError::DeliveryTimeout {
                target: self.delivery.name().to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }
}
