//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{DeliveryType, PipelineConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    batch_size: usize,
    flush_interval_ms: u64,
    delivery_name: String,
    delivery_type: DeliveryType,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    // Check file exists
    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    // Try to load and validate
    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    batch_size: config.batching.batch_size,
                    flush_interval_ms: config.batching.flush_interval_ms,
                    delivery_name: config.delivery.name.clone(),
                    delivery_type: config.delivery.delivery_type,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &PipelineConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let batching = &config.batching;

    if config.delivery.delivery_type == DeliveryType::Log {
        warnings.push("Log delivery only logs batches - records are not persisted".to_string());
    }

    // Batches slower than the timeout always fail
    if batching.delivery_timeout_ms >= batching.flush_interval_ms {
        warnings.push(format!(
            "delivery_timeout_ms ({}) is not below flush_interval_ms ({}) - interval flushes may queue up",
            batching.delivery_timeout_ms, batching.flush_interval_ms
        ));
    }

    if config.delivery.delivery_type == DeliveryType::Http
        && config
            .delivery
            .params
            .get("url")
            .is_some_and(|url| url.starts_with("http://"))
    {
        warnings.push("HTTP delivery url is not using TLS".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Batch size: {}", summary.batch_size);
            println!("  Flush interval: {} ms", summary.flush_interval_ms);
            println!(
                "  Delivery: {} ({:?})",
                summary.delivery_name, summary.delivery_type
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args_for(content: &str) -> (tempfile::NamedTempFile, ValidateArgs) {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        let args = ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
        };
        (file, args)
    }

    #[test]
    fn test_valid_config_with_warnings() {
        let (_file, args) = args_for(
            r#"
[delivery]
name = "import"
delivery_type = "http"
[delivery.params]
url = "http://localhost:8080/import"
"#,
        );
        let result = validate_config(&args);
        assert!(result.valid);
        let warnings = result.warnings.unwrap();
        assert!(warnings.iter().any(|w| w.contains("TLS")));
        assert_eq!(result.summary.unwrap().batch_size, 20);
    }

    #[test]
    fn test_invalid_config() {
        let (_file, args) = args_for(
            r#"
[delivery]
name = "out"
delivery_type = "file"
"#,
        );
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("path"));
    }

    #[test]
    fn test_missing_file() {
        let args = ValidateArgs {
            config: "/nonexistent/relay.toml".into(),
            json: false,
        };
        let result = validate_config(&args);
        assert!(!result.valid);
        assert!(run_validate(&args).is_err());
    }
}
