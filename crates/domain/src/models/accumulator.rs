//! Running totals folded from records during one aggregation cycle.

use serde::{Deserialize, Serialize};
use shared::counters::{merge_counts, merge_nested, Counts};
use std::collections::BTreeMap;

use super::metadata::InstallationTypeCode;

/// Installation counts per installation type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct InstallationTypeCounts {
    #[serde(default)]
    pub os: u64,
    #[serde(default)]
    pub container: u64,
    #[serde(default)]
    pub core: u64,
    #[serde(default)]
    pub supervised: u64,
    #[serde(default)]
    pub unsupported_container: u64,
    #[serde(default)]
    pub unknown: u64,
}

impl InstallationTypeCounts {
    /// Bump exactly one counter for the given installation type.
    pub fn bump(&mut self, code: InstallationTypeCode) {
        let counter = match code {
            InstallationTypeCode::Os => &mut self.os,
            InstallationTypeCode::Container => &mut self.container,
            InstallationTypeCode::Core => &mut self.core,
            InstallationTypeCode::Supervised => &mut self.supervised,
            InstallationTypeCode::UnsupportedContainer => &mut self.unsupported_container,
            InstallationTypeCode::Unknown => &mut self.unknown,
        };
        *counter += 1;
    }

    /// Sum over every installation type, unknown and unsupported included.
    pub fn total(&self) -> u64 {
        self.os
            + self.container
            + self.core
            + self.supervised
            + self.unsupported_container
            + self.unknown
    }

    pub fn merge(&mut self, other: &Self) {
        self.os += other.os;
        self.container += other.container;
        self.core += other.core;
        self.supervised += other.supervised;
        self.unsupported_container += other.unsupported_container;
        self.unknown += other.unknown;
    }
}

/// Usage tally for one add-on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct AddonTally {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub versions: Counts,
    #[serde(default)]
    pub protected: u64,
    #[serde(default)]
    pub auto_update: u64,
}

impl AddonTally {
    pub fn merge(&mut self, other: AddonTally) {
        self.total += other.total;
        self.protected += other.protected;
        self.auto_update += other.auto_update;
        merge_counts(&mut self.versions, other.versions);
    }
}

/// Usage tally for one custom integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CustomIntegrationTally {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub versions: Counts,
}

impl CustomIntegrationTally {
    pub fn merge(&mut self, other: CustomIntegrationTally) {
        self.total += other.total;
        merge_counts(&mut self.versions, other.versions);
    }
}

/// Supervisor architecture and health counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SupervisorTally {
    #[serde(default)]
    pub arch: Counts,
    #[serde(default)]
    pub unhealthy: u64,
    #[serde(default)]
    pub unsupported: u64,
}

/// Operating system board and version counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OperatingSystemTally {
    #[serde(default)]
    pub boards: Counts,
    #[serde(default)]
    pub versions: Counts,
}

/// Energy feature counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EnergyTally {
    #[serde(default)]
    pub count_configured: u64,
}

/// The accumulator built by one drain cycle.
///
/// Counters are only ever bumped or merged. Sample arrays feed the medians
/// computed at finalization and carry no meaningful order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Accumulator {
    #[serde(default)]
    pub addons: BTreeMap<String, AddonTally>,
    #[serde(default)]
    pub custom_integrations: BTreeMap<String, CustomIntegrationTally>,
    #[serde(default)]
    pub reports_integrations: u64,
    #[serde(default)]
    pub reports_addons: u64,
    #[serde(default)]
    pub reports_statistics: u64,
    #[serde(default)]
    pub versions: Counts,
    #[serde(default)]
    pub countries: Counts,
    #[serde(default)]
    pub installation_types: InstallationTypeCounts,
    #[serde(default)]
    pub supervisor: SupervisorTally,
    #[serde(default)]
    pub operating_system: OperatingSystemTally,
    #[serde(default)]
    pub integrations: Counts,
    #[serde(default)]
    pub count_addons: Vec<u64>,
    #[serde(default)]
    pub count_automations: Vec<u64>,
    #[serde(default)]
    pub count_integrations: Vec<u64>,
    #[serde(default)]
    pub count_states: Vec<u64>,
    #[serde(default)]
    pub count_users: Vec<u64>,
    #[serde(default)]
    pub energy: EnergyTally,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of installations folded so far.
    pub fn active_installations(&self) -> u64 {
        self.installation_types.total()
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: Accumulator) {
        merge_nested(&mut self.addons, other.addons, AddonTally::merge);
        merge_nested(
            &mut self.custom_integrations,
            other.custom_integrations,
            CustomIntegrationTally::merge,
        );
        self.reports_integrations += other.reports_integrations;
        self.reports_addons += other.reports_addons;
        self.reports_statistics += other.reports_statistics;
        merge_counts(&mut self.versions, other.versions);
        merge_counts(&mut self.countries, other.countries);
        self.installation_types.merge(&other.installation_types);

        merge_counts(&mut self.supervisor.arch, other.supervisor.arch);
        self.supervisor.unhealthy += other.supervisor.unhealthy;
        self.supervisor.unsupported += other.supervisor.unsupported;

        merge_counts(&mut self.operating_system.boards, other.operating_system.boards);
        merge_counts(
            &mut self.operating_system.versions,
            other.operating_system.versions,
        );

        merge_counts(&mut self.integrations, other.integrations);
        self.count_addons.extend(other.count_addons);
        self.count_automations.extend(other.count_automations);
        self.count_integrations.extend(other.count_integrations);
        self.count_states.extend(other.count_states);
        self.count_users.extend(other.count_users);
        self.energy.count_configured += other.energy.count_configured;
    }

    /// Sort the sample arrays so equal populations compare equal.
    pub fn canonicalize(&mut self) {
        self.count_addons.sort_unstable();
        self.count_automations.sort_unstable();
        self.count_integrations.sort_unstable();
        self.count_states.sort_unstable();
        self.count_users.sort_unstable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_installation_type_bump_and_total() {
        let mut counts = InstallationTypeCounts::default();
        counts.bump(InstallationTypeCode::Os);
        counts.bump(InstallationTypeCode::Os);
        counts.bump(InstallationTypeCode::UnsupportedContainer);
        counts.bump(InstallationTypeCode::Unknown);
        assert_eq!(counts.os, 2);
        assert_eq!(counts.unsupported_container, 1);
        assert_eq!(counts.unknown, 1);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_merge_accumulators() {
        let mut a = Accumulator::new();
        a.versions.insert("2021.4.0".to_string(), 2);
        a.installation_types.os = 2;
        a.count_states = vec![10];
        a.addons.insert(
            "core_ssh".to_string(),
            AddonTally {
                total: 1,
                versions: Counts::from([("9.0".to_string(), 1)]),
                protected: 1,
                auto_update: 0,
            },
        );

        let mut b = Accumulator::new();
        b.versions.insert("2021.4.0".to_string(), 1);
        b.installation_types.core = 1;
        b.count_states = vec![5];
        b.addons.insert(
            "core_ssh".to_string(),
            AddonTally {
                total: 1,
                versions: Counts::from([("9.1".to_string(), 1)]),
                protected: 0,
                auto_update: 1,
            },
        );

        a.merge(b);
        assert_eq!(a.versions["2021.4.0"], 3);
        assert_eq!(a.active_installations(), 3);
        assert_eq!(a.count_states, vec![10, 5]);
        let ssh = &a.addons["core_ssh"];
        assert_eq!(ssh.total, 2);
        assert_eq!(ssh.protected, 1);
        assert_eq!(ssh.auto_update, 1);
        assert_eq!(ssh.versions.len(), 2);
    }

    #[test]
    fn test_merge_with_empty_is_identity() {
        let mut a = Accumulator::new();
        a.integrations.insert("hue".to_string(), 4);
        a.energy.count_configured = 2;
        let before = a.clone();
        a.merge(Accumulator::new());
        assert_eq!(a, before);
    }

    #[test]
    fn test_canonicalize_sorts_samples() {
        let mut acc = Accumulator::new();
        acc.count_users = vec![3, 1, 2];
        acc.canonicalize();
        assert_eq!(acc.count_users, vec![1, 2, 3]);
    }

    #[test]
    fn test_deserialize_partial_document() {
        let acc: Accumulator =
            serde_json::from_str(r#"{"versions":{"2021.1.1":1},"installation_types":{"os":1}}"#)
                .unwrap();
        assert_eq!(acc.installation_types.os, 1);
        assert_eq!(acc.installation_types.unknown, 0);
        assert!(acc.addons.is_empty());
    }
}
