//! In-process pipeline counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use contracts::SubmitStatus;
use observability::{DeliveryStatsAggregator, MetricsSummary};

/// Counters shared by the pipeline, scheduler, dispatcher and requeue manager
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    accepted: AtomicU64,
    duplicates: AtomicU64,
    flush_cycles: AtomicU64,
    failed_cycles: AtomicU64,
    batches_delivered: AtomicU64,
    batches_failed: AtomicU64,
    records_delivered: AtomicU64,
    records_requeued: AtomicU64,
    /// Per-batch latency and failure reasons for the run summary
    delivery_stats: Mutex<DeliveryStatsAggregator>,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_submission(&self, status: SubmitStatus) {
        match status {
            SubmitStatus::Accepted => self.accepted.fetch_add(1, Ordering::Relaxed),
            SubmitStatus::Duplicate => self.duplicates.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub fn inc_flush_cycle(&self, failed: bool) {
        self.flush_cycles.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failed_cycles.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn inc_batch_delivered(&self, records: usize, latency_ms: f64) {
        self.batches_delivered.fetch_add(1, Ordering::Relaxed);
        self.records_delivered
            .fetch_add(records as u64, Ordering::Relaxed);
        self.delivery_stats().observe_delivered(records, latency_ms);
    }

    pub fn inc_batch_failed(&self, reason: &str, requeued: usize, latency_ms: f64) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
        self.delivery_stats()
            .observe_failed(reason, requeued, latency_ms);
    }

    pub fn add_requeued(&self, records: usize) {
        self.records_requeued
            .fetch_add(records as u64, Ordering::Relaxed);
    }

    pub fn batches_delivered(&self) -> u64 {
        self.batches_delivered.load(Ordering::Relaxed)
    }

    pub fn batches_failed(&self) -> u64 {
        self.batches_failed.load(Ordering::Relaxed)
    }

    /// Batch-level summary (latency distribution, failure reasons)
    pub fn delivery_summary(&self) -> MetricsSummary {
        self.delivery_stats().summary()
    }

    fn delivery_stats(&self) -> MutexGuard<'_, DeliveryStatsAggregator> {
        self.delivery_stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            flush_cycles: self.flush_cycles.load(Ordering::Relaxed),
            failed_cycles: self.failed_cycles.load(Ordering::Relaxed),
            batches_delivered: self.batches_delivered(),
            batches_failed: self.batches_failed(),
            records_delivered: self.records_delivered.load(Ordering::Relaxed),
            records_requeued: self.records_requeued.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of pipeline counters (for reporting)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub accepted: u64,
    pub duplicates: u64,
    pub flush_cycles: u64,
    pub failed_cycles: u64,
    pub batches_delivered: u64,
    pub batches_failed: u64,
    pub records_delivered: u64,
    pub records_requeued: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = PipelineMetrics::new();
        metrics.inc_submission(SubmitStatus::Accepted);
        metrics.inc_submission(SubmitStatus::Accepted);
        metrics.inc_submission(SubmitStatus::Duplicate);
        metrics.inc_batch_delivered(20, 12.0);
        metrics.inc_batch_failed("rejected", 25, 8.0);
        metrics.add_requeued(25);
        metrics.inc_flush_cycle(true);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.accepted, 2);
        assert_eq!(snapshot.duplicates, 1);
        assert_eq!(snapshot.records_delivered, 20);
        assert_eq!(snapshot.records_requeued, 25);
        assert_eq!(snapshot.flush_cycles, 1);
        assert_eq!(snapshot.failed_cycles, 1);

        let summary = metrics.delivery_summary();
        assert_eq!(summary.batches_delivered, 1);
        assert_eq!(summary.batches_failed, 1);
        assert_eq!(summary.latency_ms.count, 2);
        assert_eq!(summary.failure_reasons.get("rejected"), Some(&1));
    }
}
