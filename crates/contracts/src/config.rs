//! TrackerConfig - Config Loader output
//!
//! Describes the tracker identity, dispatch cadence, transport routing and an
//! optional static device snapshot.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::DeviceInformation;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Tracker identity
    pub tracker: TrackerSection,

    /// Dispatch cadence and retry policy
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Outbound transport
    #[serde(default)]
    pub transport: TransportConfig,

    /// Static device snapshot (optional)
    #[serde(default)]
    pub device: Option<DeviceInformation>,
}

/// Tracker identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSection {
    /// Application id sent with every batch
    pub app_id: String,

    /// Backend endpoint
    pub endpoint: String,
}

/// Dispatch cadence and retry policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Tick interval in milliseconds
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Consecutive failures after which the dispatcher gives up
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Start ticking even if nothing has been queued yet
    #[serde(default)]
    pub force_start_timer: bool,
}

impl DispatchConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_retries: default_max_retries(),
            force_start_timer: false,
        }
    }
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_max_retries() -> u32 {
    5
}

/// Transport type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Log batch summaries via tracing
    #[default]
    Log,
    /// Append batches as JSON lines to a file
    File,
}

/// Transport routing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Transport type
    #[serde(default)]
    pub kind: TransportKind,

    /// Output path (file transport)
    #[serde(default)]
    pub path: Option<PathBuf>,
}
