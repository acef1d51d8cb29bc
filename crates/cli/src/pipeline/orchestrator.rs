//! Relay orchestrator - wires input, pipeline and shutdown together.

use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{Delivery, PipelineConfig, SubmitStatus};
use dispatcher::BatchPipeline;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

use super::{RunStats, Submission};

/// Relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Validated pipeline configuration (CLI overrides applied)
    pub pipeline: PipelineConfig,

    /// NDJSON input file (None = stdin)
    pub input: Option<PathBuf>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,

    /// Flush everything still pending once input stops
    pub drain: bool,

    /// Upper bound on drain cycles
    pub drain_cycles: usize,
}

/// Main relay orchestrator
pub struct Relay {
    config: RelayConfig,
}

impl Relay {
    /// Create a new relay with the given configuration
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    /// Build the configured delivery target and run until input ends or
    /// `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<RunStats>
    where
        F: Future<Output = ()>,
    {
        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let batching = &self.config.pipeline.batching;
        let delivery_config = &self.config.pipeline.delivery;
        let delivery = dispatcher::create_delivery(delivery_config, batching.delivery_timeout())
            .context("Failed to create delivery target")?;

        info!(
            delivery = %delivery_config.name,
            delivery_type = ?delivery_config.delivery_type,
            "Delivery target ready"
        );

        let pipeline = BatchPipeline::new(batching, delivery);
        self.run_with(pipeline, shutdown).await
    }

    /// Run against an already-built pipeline
    pub async fn run_with<D, F>(&self, pipeline: BatchPipeline<D>, shutdown: F) -> Result<RunStats>
    where
        D: Delivery + Sync + 'static,
        F: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let mut stats = RunStats::default();

        let interval = pipeline.start_interval();

        stats.interrupted = match &self.config.input {
            Some(path) => {
                info!(input = %path.display(), "Reading submissions from file");
                let file = tokio::fs::File::open(path)
                    .await
                    .with_context(|| format!("Failed to open input {}", path.display()))?;
                ingest(&pipeline, BufReader::new(file), &mut stats, shutdown).await?
            }
            None => {
                info!("Reading submissions from stdin");
                ingest(&pipeline, BufReader::new(tokio::io::stdin()), &mut stats, shutdown).await?
            }
        };

        // Stop ticking before the final drain so the two never race
        interval.shutdown().await;

        if self.config.drain {
            let reports = pipeline.drain(self.config.drain_cycles).await;
            if reports.iter().any(|report| !report.is_success()) {
                warn!(cycles = reports.len(), "Drain stopped after a failed flush");
            }
        }

        stats.pending_at_exit = pipeline.pending_count().await;
        if stats.pending_at_exit > 0 {
            warn!(
                pending = stats.pending_at_exit,
                "Records still buffered at exit will not be delivered"
            );
        }

        stats.metrics = pipeline.metrics();
        stats.delivery = pipeline.delivery_summary();
        stats.duration = start_time.elapsed();

        info!(
            duration_secs = stats.duration.as_secs_f64(),
            accepted = stats.records_accepted,
            delivered = stats.metrics.records_delivered,
            pending = stats.pending_at_exit,
            "Relay shutdown complete"
        );

        Ok(stats)
    }
}

/// Submit every line of `reader`. Returns `true` when stopped by `shutdown`.
async fn ingest<D, R, F>(
    pipeline: &BatchPipeline<D>,
    reader: R,
    stats: &mut RunStats,
    shutdown: F,
) -> Result<bool>
where
    D: Delivery + Sync + 'static,
    R: AsyncBufRead + Unpin,
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut lines = reader.lines();
    let mut line_no = 0usize;

    loop {
        let line = tokio::select! {
            biased;
            _ = &mut shutdown => {
                warn!("Received shutdown signal, stopping input");
                return Ok(true);
            }
            line = lines.next_line() => line.context("Failed to read input")?,
        };
        let Some(line) = line else {
            info!(lines = line_no, "End of input");
            return Ok(false);
        };
        line_no += 1;

        if line.trim().is_empty() {
            continue;
        }
        stats.records_read += 1;

        let submission = match Submission::parse(&line, line_no) {
            Ok(submission) => submission,
            Err(e) => {
                stats.records_invalid += 1;
                warn!(error = %e, "Skipping invalid submission");
                continue;
            }
        };

        let (tenant, record) = submission.into_parts();
        let outcome = pipeline.submit(tenant, record).await;

        match outcome.status {
            SubmitStatus::Accepted => stats.records_accepted += 1,
            SubmitStatus::Duplicate => {
                stats.records_duplicate += 1;
                debug!(line = line_no, "Duplicate submission");
            }
        }

        if outcome.flush_failed() {
            stats.threshold_flush_failures += 1;
            if let Err(e) = outcome.into_result() {
                warn!(line = line_no, error = %e, "Threshold flush failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BatchingConfig, DeliveryConfig, DeliveryType, TenantKey};
    use dispatcher::MockDelivery;
    use std::collections::HashMap;
    use std::io::Write;
    use std::sync::Arc;

    fn relay_config(input: PathBuf, drain: bool) -> RelayConfig {
        RelayConfig {
            pipeline: PipelineConfig {
                version: Default::default(),
                batching: BatchingConfig {
                    batch_size: 10,
                    wait_interval_ms: 0,
                    ..Default::default()
                },
                delivery: DeliveryConfig {
                    name: "log".to_string(),
                    delivery_type: DeliveryType::Log,
                    params: HashMap::new(),
                },
            },
            input: Some(input),
            metrics_port: None,
            drain,
            drain_cycles: 10,
        }
    }

    fn write_input(lines: &[String]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    fn line(tenant: &str, id: usize) -> String {
        format!(
            r#"{{"tenant_id":"{tenant}","actor_id":"u1","external_id":"{tenant}-{id}","record":{{"seq":{id}}}}}"#
        )
    }

    #[tokio::test]
    async fn test_relay_file_end_to_end() {
        let mut lines: Vec<String> = (0..25).map(|i| line("t1", i)).collect();
        lines.push(line("t1", 3));
        lines.push(line("t1", 4));
        lines.push("{broken".to_string());
        lines.push(String::new());
        let input = write_input(&lines);

        let delivery = Arc::new(MockDelivery::new("mock"));
        let config = relay_config(input.path().to_path_buf(), true);
        let pipeline = BatchPipeline::new(&config.pipeline.batching, Arc::clone(&delivery));

        let stats = Relay::new(config)
            .run_with(pipeline, std::future::pending())
            .await
            .unwrap();

        assert_eq!(stats.records_read, 28);
        assert_eq!(stats.records_accepted, 25);
        assert_eq!(stats.records_duplicate, 2);
        assert_eq!(stats.records_invalid, 1);
        assert_eq!(stats.pending_at_exit, 0);
        assert!(!stats.interrupted);
        assert_eq!(stats.metrics.records_delivered, 25);

        let delivered = delivery.delivered_records(&TenantKey::new("t1", "u1"));
        let seqs: Vec<_> = delivered.iter().map(|r| r.payload["seq"].as_u64().unwrap()).collect();
        assert_eq!(seqs, (0..25).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn test_no_drain_leaves_remainder_pending() {
        let lines: Vec<String> = (0..15).map(|i| line("t1", i)).collect();
        let input = write_input(&lines);

        let delivery = Arc::new(MockDelivery::new("mock"));
        let config = relay_config(input.path().to_path_buf(), false);
        let pipeline = BatchPipeline::new(&config.pipeline.batching, Arc::clone(&delivery));

        let stats = Relay::new(config)
            .run_with(pipeline, std::future::pending())
            .await
            .unwrap();

        // One threshold flush of 10; the last 5 stay buffered
        assert_eq!(stats.metrics.records_delivered, 10);
        assert_eq!(stats.pending_at_exit, 5);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_input() {
        let lines: Vec<String> = (0..5).map(|i| line("t1", i)).collect();
        let input = write_input(&lines);

        let delivery = Arc::new(MockDelivery::new("mock"));
        let config = relay_config(input.path().to_path_buf(), true);
        let pipeline = BatchPipeline::new(&config.pipeline.batching, Arc::clone(&delivery));

        let stats = Relay::new(config)
            .run_with(pipeline, std::future::ready(()))
            .await
            .unwrap();

        assert!(stats.interrupted);
        assert_eq!(stats.records_read, 0);
    }

    #[tokio::test]
    async fn test_missing_input_file_is_error() {
        let config = relay_config(PathBuf::from("/nonexistent/input.ndjson"), true);
        let pipeline = BatchPipeline::new(
            &config.pipeline.batching,
            Arc::new(MockDelivery::new("mock")),
        );
        let result = Relay::new(config)
            .run_with(pipeline, std::future::pending())
            .await;
        assert!(result.is_err());
    }
}
