//! Published analytics snapshot.

use serde::{Deserialize, Serialize};
use shared::counters::Counts;

use super::accumulator::{EnergyTally, InstallationTypeCounts, OperatingSystemTally, SupervisorTally};

/// Version of the published snapshot document shape.
pub const ANALYTICS_SCHEMA_VERSION: u32 = 3;

/// Point-in-time aggregate over the whole population.
///
/// The `avg_*` figures hold medians; the names are kept for dashboard
/// compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CurrentAnalytics {
    #[serde(default)]
    pub avg_addons: f64,
    #[serde(default)]
    pub avg_automations: f64,
    #[serde(default)]
    pub avg_integrations: f64,
    #[serde(default)]
    pub avg_states: f64,
    #[serde(default)]
    pub avg_users: f64,
    #[serde(default)]
    pub countries: Counts,
    #[serde(default)]
    pub integrations: Counts,
    /// Milliseconds since epoch of the last refresh.
    #[serde(default)]
    pub last_updated: i64,
    /// Number of installations the full-payload figures were computed from.
    #[serde(default)]
    pub extended_data_from: u64,
    #[serde(default)]
    pub reports_integrations: u64,
    #[serde(default)]
    pub reports_addons: u64,
    #[serde(default)]
    pub reports_statistics: u64,
    #[serde(default)]
    pub versions: Counts,
    #[serde(default)]
    pub active_installations: u64,
    #[serde(default)]
    pub operating_system: OperatingSystemTally,
    #[serde(default)]
    pub supervisor: SupervisorTally,
    #[serde(default)]
    pub energy: EnergyTally,
    #[serde(default)]
    pub installation_types: InstallationTypeCounts,
}

/// One time-series point of the published history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct HistoryPoint {
    /// Milliseconds since epoch of the period start, as a string.
    pub timestamp: String,
    #[serde(default)]
    pub active_installations: u64,
    #[serde(default)]
    pub installation_types: InstallationTypeCounts,
    /// Release distribution with small releases removed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<Counts>,
}

/// The published `{current, history}` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub schema_version: u32,
    #[serde(default)]
    pub current: CurrentAnalytics,
    #[serde(default)]
    pub history: Vec<HistoryPoint>,
}

impl AnalyticsSnapshot {
    pub fn new() -> Self {
        Self {
            schema_version: ANALYTICS_SCHEMA_VERSION,
            current: CurrentAnalytics::default(),
            history: Vec::new(),
        }
    }

    /// Append a history point, replacing the last one if it covers the same period.
    pub fn upsert_history(&mut self, point: HistoryPoint) {
        match self.history.last_mut() {
            Some(last) if last.timestamp == point.timestamp => *last = point,
            _ => self.history.push(point),
        }
    }
}

impl Default for AnalyticsSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
