//! Derivation of published figures from an [`Accumulator`].

use chrono::{DateTime, Duration, DurationRound, Utc};
use shared::stats::median;
use shared::versions::group_versions;

use crate::models::{Accumulator, CurrentAnalytics, HistoryPoint};

/// Build the `current` section from a fully drained accumulator.
///
/// The reporting denominator equals the number of folded installations.
pub fn build_current(acc: &Accumulator, now: DateTime<Utc>) -> CurrentAnalytics {
    let active_installations = acc.active_installations();

    CurrentAnalytics {
        avg_addons: median(&acc.count_addons),
        avg_automations: median(&acc.count_automations),
        avg_integrations: median(&acc.count_integrations),
        avg_states: median(&acc.count_states),
        avg_users: median(&acc.count_users),
        countries: acc.countries.clone(),
        integrations: acc.integrations.clone(),
        last_updated: now.timestamp_millis(),
        extended_data_from: active_installations,
        reports_integrations: acc.reports_integrations,
        reports_addons: acc.reports_addons,
        reports_statistics: acc.reports_statistics,
        versions: acc.versions.clone(),
        active_installations,
        operating_system: acc.operating_system.clone(),
        supervisor: acc.supervisor.clone(),
        energy: acc.energy,
        installation_types: acc.installation_types,
    }
}

/// Overwrite the metadata-derivable parts of `current`.
///
/// Full-payload figures and `extended_data_from` are left as they are.
pub fn refresh_current(current: &mut CurrentAnalytics, acc: &Accumulator, now: DateTime<Utc>) {
    current.active_installations = acc.active_installations();
    current.installation_types = acc.installation_types;
    current.versions = acc.versions.clone();
    current.countries = acc.countries.clone();
    current.last_updated = now.timestamp_millis();
}

/// Start of the history period containing `now` (UTC hour).
pub fn period_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.duration_trunc(Duration::hours(1)).unwrap_or(now)
}

/// Build a history point for the period containing `now`.
pub fn history_point(acc: &Accumulator, now: DateTime<Utc>, version_threshold: u64) -> HistoryPoint {
    HistoryPoint {
        timestamp: period_start(now).timestamp_millis().to_string(),
        active_installations: acc.active_installations(),
        installation_types: acc.installation_types,
        versions: Some(group_versions(&acc.versions, version_threshold)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_accumulator() -> Accumulator {
        let mut acc = Accumulator::new();
        acc.installation_types.os = 3;
        acc.installation_types.unknown = 1;
        acc.installation_types.unsupported_container = 1;
        acc.versions.insert("2021.4.0".to_string(), 150);
        acc.versions.insert("2021.3.0".to_string(), 2);
        acc.count_states = vec![5, 1, 3, 100];
        acc.count_users = vec![2];
        acc.reports_integrations = 2;
        acc
    }

    #[test]
    fn test_build_current() {
        let now = Utc.with_ymd_and_hms(2021, 5, 1, 12, 30, 0).unwrap();
        let current = build_current(&sample_accumulator(), now);

        assert_eq!(current.active_installations, 5);
        assert_eq!(current.extended_data_from, 5);
        assert_eq!(current.avg_states, 4.0);
        assert_eq!(current.avg_users, 2.0);
        assert_eq!(current.avg_addons, 0.0);
        assert_eq!(current.reports_integrations, 2);
        assert_eq!(current.last_updated, now.timestamp_millis());
        assert_eq!(current.versions.len(), 2);
    }

    #[test]
    fn test_refresh_current_keeps_extended_figures() {
        let now = Utc.with_ymd_and_hms(2021, 5, 1, 12, 30, 0).unwrap();
        let mut current = CurrentAnalytics {
            extended_data_from: 3,
            reports_integrations: 1337,
            ..Default::default()
        };
        refresh_current(&mut current, &sample_accumulator(), now);

        assert_eq!(current.active_installations, 5);
        assert_eq!(current.extended_data_from, 3);
        assert_eq!(current.reports_integrations, 1337);
        assert_eq!(current.installation_types.os, 3);
    }

    #[test]
    fn test_period_start_truncates_to_hour() {
        let now = Utc.with_ymd_and_hms(2021, 5, 1, 12, 59, 59).unwrap();
        let start = period_start(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2021, 5, 1, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_history_point_groups_versions() {
        let now = Utc.with_ymd_and_hms(2021, 5, 1, 12, 15, 0).unwrap();
        let point = history_point(&sample_accumulator(), now, 100);

        assert_eq!(
            point.timestamp,
            Utc.with_ymd_and_hms(2021, 5, 1, 12, 0, 0)
                .unwrap()
                .timestamp_millis()
                .to_string()
        );
        assert_eq!(point.active_installations, 5);
        let versions = point.versions.unwrap();
        assert_eq!(versions.get("2021.4"), Some(&150));
        assert!(!versions.contains_key("2021.3"));
    }
}
