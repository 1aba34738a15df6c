//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{TrackerConfig, TransportKind};
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
    app_id: String,
    interval_ms: u64,
    max_retries: u32,
    transport: String,
    has_device: bool,
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

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    app_id: config.tracker.app_id.clone(),
                    interval_ms: config.dispatch.interval_ms,
                    max_retries: config.dispatch.max_retries,
                    transport: format!("{:?}", config.transport.kind),
                    has_device: config.device.is_some(),
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
fn collect_warnings(config: &TrackerConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let endpoint = &config.tracker.endpoint;
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        warnings.push(format!("tracker.endpoint '{endpoint}' is not an http(s) URL"));
    }

    if config.dispatch.interval_ms < 100 {
        warnings.push(format!(
            "dispatch.interval_ms = {} is very short, most ticks will be skipped or idle",
            config.dispatch.interval_ms
        ));
    }

    if config.device.is_none() {
        warnings.push("No [device] section - batches carry no device information".to_string());
    }

    if config.transport.kind == TransportKind::File {
        if let Some(parent) = config
            .transport
            .path
            .as_deref()
            .and_then(|p| p.parent())
            .filter(|p| !p.as_os_str().is_empty() && !p.exists())
        {
            warnings.push(format!(
                "transport.path directory '{}' does not exist yet and will be created",
                parent.display()
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  App: {}", summary.app_id);
            println!("  Interval: {} ms", summary.interval_ms);
            println!("  Max retries: {}", summary.max_retries);
            println!("  Transport: {}", summary.transport);
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
