//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{DeviceInformation, TrackerConfig};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo<'a> {
    version: String,
    app_id: &'a str,
    endpoint: &'a str,
    dispatch: DispatchInfo,
    transport: TransportInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    device: Option<&'a DeviceInformation>,
}

#[derive(Serialize)]
struct DispatchInfo {
    interval_ms: u64,
    max_retries: u32,
    force_start_timer: bool,
}

#[derive(Serialize)]
struct TransportInfo {
    kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&build_config_info(&config))
            .context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config);
    }

    Ok(())
}

fn build_config_info(config: &TrackerConfig) -> ConfigInfo<'_> {
    ConfigInfo {
        version: format!("{:?}", config.version),
        app_id: &config.tracker.app_id,
        endpoint: &config.tracker.endpoint,
        dispatch: DispatchInfo {
            interval_ms: config.dispatch.interval_ms,
            max_retries: config.dispatch.max_retries,
            force_start_timer: config.dispatch.force_start_timer,
        },
        transport: TransportInfo {
            kind: format!("{:?}", config.transport.kind).to_lowercase(),
            path: config
                .transport
                .path
                .as_ref()
                .map(|p| p.display().to_string()),
        },
        device: config.device.as_ref(),
    }
}

fn print_config_info(config: &TrackerConfig) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                  BatchBus Configuration                      ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📍 Tracker");
    println!("   ├─ Version: {:?}", config.version);
    println!("   ├─ App: {}", config.tracker.app_id);
    println!("   └─ Endpoint: {}", config.tracker.endpoint);

    let dispatch = &config.dispatch;
    println!("\n⚙️  Dispatch");
    println!("   ├─ Interval: {} ms", dispatch.interval_ms);
    println!("   ├─ Max retries: {}", dispatch.max_retries);
    println!("   └─ Force start timer: {}", dispatch.force_start_timer);

    println!("\n📤 Transport");
    match &config.transport.path {
        Some(path) => {
            println!("   ├─ Kind: {:?}", config.transport.kind);
            println!("   └─ Path: {}", path.display());
        }
        None => println!("   └─ Kind: {:?}", config.transport.kind),
    }

    match &config.device {
        Some(device) => {
            println!("\n📱 Device");
            println!("   ├─ OS: {} {}", device.os_name, device.os_version);
            println!("   ├─ Model: {}", device.model);
            println!("   ├─ App version: {}", device.app_version);
            println!("   └─ Locale: {}", device.locale);
        }
        None => println!("\n📱 Device: (not configured)"),
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    #[test]
    fn test_build_config_info() {
        let config = ConfigLoader::load_from_str(
            r#"
[tracker]
app_id = "demo"
endpoint = "https://collector.example"

[transport]
kind = "file"
path = "out/batches.jsonl"
"#,
            ConfigFormat::Toml,
        )
        .unwrap();

        let info = build_config_info(&config);
        assert_eq!(info.app_id, "demo");
        assert_eq!(info.transport.kind, "file");
        assert_eq!(info.dispatch.interval_ms, 1000);
        assert!(info.device.is_none());

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["transport"]["path"], "out/batches.jsonl");
        assert!(json.get("device").is_none());
    }
}
