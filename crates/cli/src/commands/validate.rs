//! `validate` command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use contracts::SplayConfig;
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
    listen: String,
    bucket_count: usize,
    forward_count: usize,
    forward_timeout_secs: u64,
    notify_ttl_ms: u64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(&args.config);

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

fn validate_config(path: &Path) -> ValidationResult {
    let config_path = path.display().to_string();

    if !path.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", path.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(path) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    listen: format!("{}:{}", config.server.host, config.server.port),
                    bucket_count: config.buckets.len(),
                    forward_count: config.buckets.iter().map(|b| b.forwards.len()).sum(),
                    forward_timeout_secs: config.forward.timeout_secs,
                    notify_ttl_ms: config.notify.ttl_ms,
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

/// Non-fatal issues
fn collect_warnings(config: &SplayConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.buckets.is_empty() {
        warnings.push("No buckets configured - every request will get 404".to_string());
    }

    for bucket in &config.buckets {
        if bucket.forwards.is_empty() {
            warnings.push(format!(
                "Bucket '{}' has no forward targets - events are only recorded",
                bucket.slug
            ));
        }
    }

    if config.notify.poll_interval_ms > config.notify.ttl_ms {
        warnings.push(format!(
            "notify.poll_interval_ms ({}) exceeds notify.ttl_ms ({}) - refreshes may lag",
            config.notify.poll_interval_ms, config.notify.ttl_ms
        ));
    }

    if config.server.ingest_token.is_none() {
        warnings.push("server.ingest_token is unset - ingestion is open to any caller".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Listen: {}", summary.listen);
            println!("  Buckets: {}", summary.bucket_count);
            println!("  Forward targets: {}", summary.forward_count);
            println!("  Forward timeout: {}s", summary.forward_timeout_secs);
            println!("  Notify TTL: {}ms", summary.notify_ttl_ms);
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
