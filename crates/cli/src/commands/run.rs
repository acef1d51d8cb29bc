//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Relay, RelayConfig};
use config_loader::{ConfigLoader, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    // Validate config path
    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    // Load and parse configuration
    let mut config = ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    apply_overrides(&mut config, args);
    ConfigLoader::validate(&config).context("Invalid configuration after CLI overrides")?;

    info!(
        batch_size = config.batching.batch_size,
        wait_interval_ms = config.batching.wait_interval_ms,
        flush_interval_ms = config.batching.flush_interval_ms,
        delivery_timeout_ms = config.batching.delivery_timeout_ms,
        delivery = %config.delivery.name,
        "Configuration loaded"
    );

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let relay_config = RelayConfig {
        pipeline: config,
        input: args.input.clone(),
        metrics_port: if args.metrics_port == 0 {
            None
        } else {
            Some(args.metrics_port)
        },
        drain: !args.no_drain,
        drain_cycles: args.drain_cycles,
    };

    info!("Starting relay...");

    let stats = Relay::new(relay_config)
        .run(shutdown_signal())
        .await
        .context("Relay execution failed")?;

    info!(
        records_accepted = stats.records_accepted,
        records_delivered = stats.metrics.records_delivered,
        pending = stats.pending_at_exit,
        duration_secs = stats.duration.as_secs_f64(),
        "Relay completed"
    );

    stats.print_summary();

    info!("Batch Relay finished");
    Ok(())
}

/// Apply CLI / environment overrides on top of the file configuration
fn apply_overrides(config: &mut PipelineConfig, args: &RunArgs) {
    let batching = &mut config.batching;
    if let Some(batch_size) = args.batch_size {
        info!(batch_size, "Overriding batch size from CLI");
        batching.batch_size = batch_size;
    }
    if let Some(wait_interval_ms) = args.wait_interval_ms {
        info!(wait_interval_ms, "Overriding wait interval from CLI");
        batching.wait_interval_ms = wait_interval_ms;
    }
    if let Some(flush_interval_ms) = args.flush_interval_ms {
        info!(flush_interval_ms, "Overriding flush interval from CLI");
        batching.flush_interval_ms = flush_interval_ms;
    }
    if let Some(delivery_timeout_ms) = args.delivery_timeout_ms {
        info!(delivery_timeout_ms, "Overriding delivery timeout from CLI");
        batching.delivery_timeout_ms = delivery_timeout_ms;
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &PipelineConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Batching:");
    println!("  Batch size: {}", config.batching.batch_size);
    println!("  Wait interval: {} ms", config.batching.wait_interval_ms);
    println!("  Flush interval: {} ms", config.batching.flush_interval_ms);
    println!("  Delivery timeout: {} ms", config.batching.delivery_timeout_ms);
    println!(
        "\nDelivery: {} ({:?})",
        config.delivery.name, config.delivery.delivery_type
    );
    println!();
}
