//! Relay run statistics.

use std::time::Duration;

use dispatcher::MetricsSnapshot;
use observability::MetricsSummary;

/// Statistics from a relay run
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    /// Non-blank input lines
    pub records_read: u64,

    /// Submissions accepted into the buffer
    pub records_accepted: u64,

    /// Submissions rejected as duplicates
    pub records_duplicate: u64,

    /// Lines that could not be parsed
    pub records_invalid: u64,

    /// Threshold flushes in which some tenant failed
    pub threshold_flush_failures: u64,

    /// Records still buffered when the run ended (lost on exit)
    pub pending_at_exit: usize,

    /// Input stopped by a shutdown signal rather than end of input
    pub interrupted: bool,

    /// Total duration of the run
    pub duration: Duration,

    /// Pipeline counters at exit
    pub metrics: MetricsSnapshot,

    /// Batch latency and failure breakdown
    pub delivery: MetricsSummary,
}

impl RunStats {
    /// Accepted records per second
    pub fn throughput(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.records_accepted as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                     Relay Statistics                         ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");

        println!("📊 Input");
        println!("   ├─ Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   ├─ Records read: {}", self.records_read);
        println!("   ├─ Accepted: {}", self.records_accepted);
        println!("   ├─ Duplicates: {}", self.records_duplicate);
        println!("   ├─ Invalid lines: {}", self.records_invalid);
        println!("   └─ Throughput: {:.2} records/s", self.throughput());

        println!("\n📤 Delivery");
        println!("   ├─ Flush cycles: {}", self.metrics.flush_cycles);
        println!("   ├─ Failed cycles: {}", self.metrics.failed_cycles);
        println!("   ├─ Batches sent: {}", self.metrics.batches_delivered);
        println!("   ├─ Batches failed: {}", self.metrics.batches_failed);
        println!("   ├─ Records delivered: {}", self.metrics.records_delivered);
        println!("   ├─ Records requeued: {}", self.metrics.records_requeued);
        println!("   ├─ Batch latency (ms): {}", self.delivery.latency_ms);
        println!("   └─ Pending at exit: {}", self.pending_at_exit);

        if !self.delivery.failure_reasons.is_empty() {
            println!("\n⚠️  Failure Reasons");
            for (reason, count) in &self.delivery.failure_reasons {
                println!("   ├─ {}: {}", reason, count);
            }
        }

        if self.interrupted {
            println!("\n⏹  Input interrupted by shutdown signal");
        }

        println!();
    }
}
