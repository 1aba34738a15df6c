//! DeviceInformation - device metadata snapshot

use serde::{Deserialize, Serialize};

/// Immutable snapshot of device metadata
///
/// Collected once by the host application and attached to every batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceInformation {
    /// Operating system name (e.g. "android", "ios")
    pub os_name: String,

    /// Operating system version
    pub os_version: String,

    /// Device model
    pub model: String,

    /// Application identifier
    #[serde(default)]
    pub app_id: String,

    /// Application version
    #[serde(default)]
    pub app_version: String,

    /// Locale (e.g. "en_US")
    #[serde(default)]
    pub locale: String,
}
