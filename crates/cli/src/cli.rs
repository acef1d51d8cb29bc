//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Batch Relay - tenant-batched record buffering and delivery
#[derive(Parser, Debug)]
#[command(
    name = "batch-relay",
    author,
    version,
    about = "Tenant-batched record buffering and delivery pipeline",
    long_about = "Buffers records per (tenant, actor), deduplicates them by external id, \n\
                  and delivers them downstream in bounded batches. Failed batches are \n\
                  requeued ahead of newer records and retried on the next flush."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BATCH_RELAY_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BATCH_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read NDJSON submissions and relay them downstream
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "BATCH_RELAY_CONFIG"
    )]
    pub config: PathBuf,

    /// NDJSON submissions file (stdin when omitted)
    #[arg(short, long, env = "BATCH_RELAY_INPUT")]
    pub input: Option<PathBuf>,

    /// Override batching.batch_size
    #[arg(long, env = "BATCH_RELAY_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// Override batching.wait_interval_ms
    #[arg(long, env = "BATCH_RELAY_WAIT_INTERVAL_MS")]
    pub wait_interval_ms: Option<u64>,

    /// Override batching.flush_interval_ms
    #[arg(long, env = "BATCH_RELAY_FLUSH_INTERVAL_MS")]
    pub flush_interval_ms: Option<u64>,

    /// Override batching.delivery_timeout_ms
    #[arg(long, env = "BATCH_RELAY_DELIVERY_TIMEOUT_MS")]
    pub delivery_timeout_ms: Option<u64>,

    /// Leave pending records unsent at end of input
    #[arg(long)]
    pub no_drain: bool,

    /// Maximum flush cycles when draining at end of input
    #[arg(long, default_value = "10", env = "BATCH_RELAY_DRAIN_CYCLES")]
    pub drain_cycles: usize,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BATCH_RELAY_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_overrides() {
        let cli = Cli::try_parse_from([
            "batch-relay",
            "run",
            "--config",
            "relay.toml",
            "--input",
            "records.ndjson",
            "--batch-size",
            "50",
            "--no-drain",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.config, PathBuf::from("relay.toml"));
                assert_eq!(args.input, Some(PathBuf::from("records.ndjson")));
                assert_eq!(args.batch_size, Some(50));
                assert!(args.no_drain);
                assert_eq!(args.drain_cycles, 10);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["batch-relay", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}
