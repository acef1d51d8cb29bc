//! BatchPipeline - the entry point producers talk to
//!
//! Wires registry, dispatcher, requeue manager and scheduler around one
//! delivery target. Clones share all state.

use std::sync::Arc;

use buffer::{EnqueueOutcome, QueueRegistry};
use contracts::{BatchingConfig, Delivery, Record, SubmitStatus, TenantKey};
use observability::MetricsSummary;
use tracing::{debug, info, instrument};

use crate::dispatcher::{BatchDispatcher, DispatchSettings};
use crate::error::DispatcherError;
use crate::handle::IntervalHandle;
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::report::{FlushReport, FlushTrigger};
use crate::requeue::RequeueManager;
use crate::scheduler::FlushScheduler;

/// Result of [`BatchPipeline::submit`]
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub status: SubmitStatus,
    /// Present when this submit crossed the threshold and ran a flush
    pub flush: Option<FlushReport>,
}

impl SubmitOutcome {
    pub fn is_accepted(&self) -> bool {
        self.status == SubmitStatus::Accepted
    }

    pub fn is_duplicate(&self) -> bool {
        self.status == SubmitStatus::Duplicate
    }

    /// The submit triggered a flush and some tenant failed in it
    pub fn flush_failed(&self) -> bool {
        self.flush.as_ref().is_some_and(|report| !report.is_success())
    }

    /// Surface a failed threshold flush as an error.
    ///
    /// The record itself is safe either way: it was either delivered or
    /// requeued.
    pub fn into_result(self) -> Result<SubmitStatus, DispatcherError> {
        if let Some(report) = self.flush {
            report.into_result()?;
        }
        Ok(self.status)
    }
}

pub struct BatchPipeline<D> {
    registry: Arc<QueueRegistry>,
    scheduler: FlushScheduler<D>,
    metrics: Arc<PipelineMetrics>,
    settings: DispatchSettings,
}

impl<D> Clone for BatchPipeline<D> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            scheduler: self.scheduler.clone(),
            metrics: Arc::clone(&self.metrics),
            settings: self.settings,
        }
    }
}

impl<D> BatchPipeline<D>
where
    D: Delivery + Sync + 'static,
{
    pub fn new(config: &BatchingConfig, delivery: D) -> Self {
        Self::with_registry(config, delivery, Arc::new(QueueRegistry::new()))
    }

    /// Build around an existing registry (tests, status tooling)
    pub fn with_registry(config: &BatchingConfig, delivery: D, registry: Arc<QueueRegistry>) -> Self {
        let metrics = Arc::new(PipelineMetrics::new());
        let settings = DispatchSettings::from_config(config);
        let requeue = RequeueManager::new(Arc::clone(&registry), Arc::clone(&metrics));
        let dispatcher =
            BatchDispatcher::new(Arc::new(delivery), requeue, Arc::clone(&metrics), settings);
        let scheduler = FlushScheduler::new(
            Arc::clone(&registry),
            dispatcher,
            Arc::clone(&metrics),
            config.flush_interval(),
        );

        info!(
            batch_size = settings.batch_size,
            wait_interval_ms = config.wait_interval_ms,
            flush_interval_ms = config.flush_interval_ms,
            delivery_timeout_ms = config.delivery_timeout_ms,
            "Batch pipeline created"
        );

        Self {
            registry,
            scheduler,
            metrics,
            settings,
        }
    }

    /// Hand a record to the buffer.
    ///
    /// When the accepted record brings the pending count to the batch size,
    /// a flush runs before this returns and its report is attached.
    #[instrument(
        name = "pipeline_submit",
        skip(self, record),
        fields(tenant = %tenant)
    )]
    pub async fn submit(&self, tenant: TenantKey, record: Record) -> SubmitOutcome {
        let outcome = self.registry.enqueue(tenant.clone(), record).await;
        let status = outcome.status();
        self.metrics.inc_submission(status);
        observability::record_submission(&tenant, status);

        let flush = match outcome {
            EnqueueOutcome::Duplicate => {
                debug!("Duplicate record ignored");
                None
            }
            EnqueueOutcome::Accepted { pending } => {
                observability::record_pending(pending);
                if self.scheduler.should_flush(pending) {
                    debug!(pending, "Batch size reached, flushing");
                    Some(self.scheduler.flush(FlushTrigger::Threshold).await)
                } else {
                    None
                }
            }
        };

        SubmitOutcome { status, flush }
    }

    /// Flush now, regardless of thresholds
    pub async fn flush(&self) -> FlushReport {
        self.scheduler.flush(FlushTrigger::Manual).await
    }

    /// Flush until nothing is pending, a cycle fails, or `max_cycles` ran
    #[instrument(name = "pipeline_drain", skip(self))]
    pub async fn drain(&self, max_cycles: usize) -> Vec<FlushReport> {
        let mut reports = Vec::new();
        for _ in 0..max_cycles {
            let Some(report) = self.scheduler.flush_if_pending(FlushTrigger::Manual).await else {
                break;
            };
            let failed = !report.is_success();
            reports.push(report);
            if failed {
                break;
            }
        }
        info!(
            cycles = reports.len(),
            pending = self.registry.pending_count().await,
            "Drain finished"
        );
        reports
    }

    /// Start the periodic flush task
    pub fn start_interval(&self) -> IntervalHandle {
        self.scheduler.spawn_interval()
    }

    pub async fn pending_count(&self) -> usize {
        self.registry.pending_count().await
    }

    pub fn registry(&self) -> &Arc<QueueRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> DispatchSettings {
        self.settings
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Batch latency distribution and failure reasons so far
    pub fn delivery_summary(&self) -> MetricsSummary {
        self.metrics.delivery_summary()
    }
}
