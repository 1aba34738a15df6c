//! `simulate` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

use crate::cli::SimulateArgs;
use crate::pipeline::{Simulation, SimulationConfig};

/// Execute the `simulate` command
pub async fn run_simulate(args: &SimulateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let tracker = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    info!(
        app_id = %tracker.tracker.app_id,
        interval_ms = tracker.dispatch.interval_ms,
        max_retries = tracker.dispatch.max_retries,
        transport = ?tracker.transport.kind,
        "Configuration loaded"
    );

    let simulation = Simulation::new(SimulationConfig {
        tracker,
        producers: args.producers,
        batches_per_producer: args.batches_per_producer,
        events_per_batch: args.events_per_batch,
        failure_rate: args.failure_rate,
        duration: (args.duration_secs > 0).then(|| Duration::from_secs(args.duration_secs)),
        seed: args.seed,
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    tokio::select! {
        result = simulation.run() => {
            let stats = result.context("Simulation failed")?;
            info!(
                batches = stats.batches_generated,
                sent = stats.report.metrics.sent_count,
                records_per_sec = format!("{:.2}", stats.throughput()),
                "Simulation finished"
            );
            stats.print_summary();
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, stopping simulation...");
        }
    }

    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
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
