//! FlushScheduler - decides when a snapshot is taken and sent
//!
//! Two triggers feed the same cycle: the pending count reaching the batch
//! size (checked by the caller after each accepted submit) and a periodic
//! background tick. Cycles never overlap; a trigger arriving mid-cycle waits
//! for the gate and then snapshots whatever has accumulated.

use std::sync::Arc;
use std::time::Duration;

use buffer::QueueRegistry;
use contracts::Delivery;
use tokio::sync::{mpsc, Mutex};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn, Instrument};

use crate::dispatcher::BatchDispatcher;
use crate::handle::IntervalHandle;
use crate::metrics::PipelineMetrics;
use crate::report::{FlushReport, FlushResult, FlushTrigger};

pub struct FlushScheduler<D> {
    registry: Arc<QueueRegistry>,
    dispatcher: BatchDispatcher<D>,
    metrics: Arc<PipelineMetrics>,
    gate: Arc<Mutex<()>>,
    flush_interval: Duration,
}

impl<D> Clone for FlushScheduler<D> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            dispatcher: self.dispatcher.clone(),
            metrics: Arc::clone(&self.metrics),
            gate: Arc::clone(&self.gate),
            flush_interval: self.flush_interval,
        }
    }
}

impl<D> FlushScheduler<D>
where
    D: Delivery + Sync + 'static,
{
    pub fn new(
        registry: Arc<QueueRegistry>,
        dispatcher: BatchDispatcher<D>,
        metrics: Arc<PipelineMetrics>,
        flush_interval: Duration,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            metrics,
            gate: Arc::new(Mutex::new(())),
            flush_interval,
        }
    }

    /// Threshold rule applied after every accepted submit
    pub fn should_flush(&self, pending: usize) -> bool {
        pending >= self.dispatcher.settings().batch_size
    }

    /// Run one snapshot → send → requeue cycle.
    ///
    /// Records enqueued while the cycle is sending are not part of it; they
    /// wait for the next trigger. The cycle runs as its own task and holds the
    /// gate until its last requeue, so dropping the returned future does not
    /// let a later cycle overlap it.
    #[instrument(name = "scheduler_flush", skip(self), fields(trigger = %trigger))]
    pub async fn flush(&self, trigger: FlushTrigger) -> FlushReport {
        let scheduler = self.clone();
        let cycle =
            tokio::spawn(async move { scheduler.run_cycle(trigger).await }.in_current_span());

        match cycle.await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Flush cycle task failed");
                FlushReport::empty(trigger)
            }
        }
    }

    async fn run_cycle(&self, trigger: FlushTrigger) -> FlushReport {
        let _cycle = self.gate.lock().await;
        let started = Instant::now();

        let snapshot = self.registry.snapshot_and_clear().await;
        if snapshot.is_empty() {
            debug!("Nothing pending, flush skipped");
            return FlushReport::empty(trigger);
        }

        let records = snapshot.record_count();
        let tenants = self.dispatcher.dispatch(snapshot).await;
        let report = FlushReport {
            trigger,
            tenants,
            duration: started.elapsed(),
        };

        let result = report.result();
        self.metrics.inc_flush_cycle(result == FlushResult::PartialFailure);
        observability::record_flush_cycle(
            trigger.as_str(),
            result.as_str(),
            report.duration.as_secs_f64() * 1000.0,
        );
        let pending = self.registry.pending_count().await;
        observability::record_pending(pending);

        match result {
            FlushResult::PartialFailure => warn!(
                records,
                delivered = report.records_delivered(),
                requeued = report.records_requeued(),
                failed_tenants = report.failed_tenants().len(),
                pending,
                "Flush completed with failures"
            ),
            _ => info!(
                records,
                tenants = report.tenants.len(),
                duration_ms = report.duration.as_millis() as u64,
                pending,
                "Flush completed"
            ),
        }

        report
    }

    /// Flush only when something is waiting
    pub async fn flush_if_pending(&self, trigger: FlushTrigger) -> Option<FlushReport> {
        if self.registry.pending_count().await == 0 {
            return None;
        }
        Some(self.flush(trigger).await)
    }

    /// Start the periodic flush task.
    ///
    /// The first tick fires one full interval after the call. Failures are
    /// logged and retried on a later tick; the task only ends through
    /// [`IntervalHandle::shutdown`].
    pub fn spawn_interval(&self) -> IntervalHandle {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        let scheduler = self.clone();
        let worker = tokio::spawn(async move {
            interval_worker(scheduler, stop_rx).await;
        });
        IntervalHandle::new(stop_tx, worker)
    }
}

#[instrument(
    name = "scheduler_interval_loop",
    skip(scheduler, stop_rx),
    fields(interval_ms = scheduler.flush_interval.as_millis() as u64)
)]
async fn interval_worker<D>(scheduler: FlushScheduler<D>, mut stop_rx: mpsc::Receiver<()>)
where
    D: Delivery + Sync + 'static,
{
    let period = scheduler.flush_interval;
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!("Interval flush task started");

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = ticker.tick() => {
                if let Some(report) = scheduler.flush_if_pending(FlushTrigger::Interval).await {
                    if !report.is_success() {
                        warn!(
                            failed_tenants = report.failed_tenants().len(),
                            requeued = report.records_requeued(),
                            "Interval flush failed, retrying on a later tick"
                        );
                    }
                }
            }
        }
    }

    debug!("Interval flush task stopped");
}
