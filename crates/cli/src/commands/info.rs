//! `info` command implementation.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use contracts::PipelineConfig;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;
use crate::error::CliError;

/// Parameters whose values are never printed
const SECRET_PARAMS: &[&str] = &["api_key", "authorization"];

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    batching: BatchingInfo,
    delivery: DeliveryInfo,
}

#[derive(Serialize)]
struct BatchingInfo {
    batch_size: usize,
    wait_interval_ms: u64,
    flush_interval_ms: u64,
    delivery_timeout_ms: u64,
}

#[derive(Serialize)]
struct DeliveryInfo {
    name: String,
    delivery_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &PipelineConfig) -> ConfigInfo {
    let params = config
        .delivery
        .params
        .iter()
        .map(|(key, value)| {
            let shown = if SECRET_PARAMS.contains(&key.as_str()) {
                "***".to_string()
            } else {
                value.clone()
            };
            (key.clone(), shown)
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", config.version),
        batching: BatchingInfo {
            batch_size: config.batching.batch_size,
            wait_interval_ms: config.batching.wait_interval_ms,
            flush_interval_ms: config.batching.flush_interval_ms,
            delivery_timeout_ms: config.batching.delivery_timeout_ms,
        },
        delivery: DeliveryInfo {
            name: config.delivery.name.clone(),
            delivery_type: format!("{:?}", config.delivery.delivery_type),
            params,
        },
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Batch Relay Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let batching = &info.batching;
    println!("📦 Batching");
    println!("   ├─ Version: {}", info.version);
    println!("   ├─ Batch size: {}", batching.batch_size);
    println!("   ├─ Wait interval: {} ms", batching.wait_interval_ms);
    println!("   ├─ Flush interval: {} ms", batching.flush_interval_ms);
    println!("   └─ Delivery timeout: {} ms", batching.delivery_timeout_ms);

    let delivery = &info.delivery;
    println!("\n📤 Delivery");
    println!("   ├─ Name: {}", delivery.name);
    if delivery.params.is_empty() {
        println!("   └─ Type: {}", delivery.delivery_type);
    } else {
        println!("   ├─ Type: {}", delivery.delivery_type);
        println!("   └─ Params:");
        for (i, (key, value)) in delivery.params.iter().enumerate() {
            let prefix = if i == delivery.params.len() - 1 { "└─" } else { "├─" };
            println!("        {} {}: {}", prefix, key, value);
        }
    }

    println!();
}
