//! Telemetry record submitted by one installation.
//!
//! Records are written by the ingestion collaborator and are read-only to the
//! aggregation pipeline. Every section except the version and installation
//! type is optional; an installation only sends what it opted into sharing.

use serde::{Deserialize, Serialize};

/// Installation type as reported in a full record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum InstallationType {
    #[serde(rename = "Home Assistant OS")]
    Os,
    #[serde(rename = "Home Assistant Container")]
    Container,
    #[serde(rename = "Home Assistant Core")]
    Core,
    #[serde(rename = "Home Assistant Supervised")]
    Supervised,
    #[serde(rename = "Unsupported Third Party Container")]
    UnsupportedContainer,
    #[default]
    #[serde(rename = "Unknown", other)]
    Unknown,
}

/// Custom integration usage entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomIntegrationUsage {
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Add-on usage entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddonUsage {
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<bool>,
}

/// Operating system information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingSystemInfo {
    pub board: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Supervisor information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorInfo {
    #[serde(default = "default_true")]
    pub healthy: bool,
    #[serde(default = "default_true")]
    pub supported: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

/// Energy feature information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnergyInfo {
    #[serde(default)]
    pub configured: bool,
}

/// Recorder (history database) information.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecorderInfo {
    pub engine: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Full telemetry record stored under an installation identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TelemetryRecord {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub installation_type: InstallationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_integrations: Option<Vec<CustomIntegrationUsage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addons: Option<Vec<AddonUsage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<OperatingSystemInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor: Option<SupervisorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub addon_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energy: Option<EnergyInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recorder: Option<RecorderInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<bool>,
    /// Write timestamp carried by records stored before side metadata existed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_write: Option<i64>,
}

impl TelemetryRecord {
    /// Whether the record includes the statistics section.
    pub fn shares_statistics(&self) -> bool {
        self.integration_count.is_some_and(|n| n > 0)
    }
}
