//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// BatchBus - telemetry batch aggregation and dispatch
#[derive(Parser, Debug)]
#[command(
    name = "batchbus",
    author,
    version,
    about = "Telemetry batch aggregation and dispatch",
    long_about = "Aggregates telemetry batches from concurrent producers, consolidates them \n\
                  into one in-flight batch at a time and dispatches it through the \n\
                  configured transport with retry and give-up semantics."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "BATCHBUS_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "BATCHBUS_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run producers against a shared bus while the dispatcher drains it
    Simulate(SimulateArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `simulate` command
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "tracker.toml",
        env = "BATCHBUS_CONFIG"
    )]
    pub config: PathBuf,

    /// Number of concurrent producer tasks
    #[arg(long, default_value = "4", value_parser = clap::value_parser!(u32).range(1..))]
    pub producers: u32,

    /// Batches generated by each producer
    #[arg(long, default_value = "25")]
    pub batches_per_producer: u32,

    /// Events per generated batch
    #[arg(long, default_value = "5")]
    pub events_per_batch: u32,

    /// Share of transport sends that fail (0.0 - 1.0)
    #[arg(long, default_value = "0.0", env = "BATCHBUS_FAILURE_RATE")]
    pub failure_rate: f64,

    /// Stop after this many seconds (0 = run until drained)
    #[arg(long, default_value = "0", env = "BATCHBUS_DURATION")]
    pub duration_secs: u64,

    /// Seed for failure injection
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "0", env = "BATCHBUS_METRICS_PORT")]
    pub metrics_port: u16,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "tracker.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "tracker.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
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
