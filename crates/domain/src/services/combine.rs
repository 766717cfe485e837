//! Folding of records into an [`Accumulator`].
//!
//! Both fold variants only bump counters and append samples, so applying
//! them to a population in any order yields the same totals.

use shared::counters::bump;

use crate::models::{
    Accumulator, AllowLists, InstallationTypeCode, RecordMetadata, TelemetryRecord,
};

/// Add-on slugs with this prefix are locally built add-ons and never counted.
pub const LOCAL_ADDON_PREFIX: &str = "local_";

/// Fold the side metadata of one record.
pub fn combine_metadata(acc: &mut Accumulator, metadata: &RecordMetadata) {
    combine_base(
        acc,
        metadata.version.as_deref(),
        metadata.country.as_deref(),
        metadata.installation_type,
    );
}

/// Fold a full record.
///
/// Performs everything [`combine_metadata`] does plus the optional sections.
pub fn combine_record(acc: &mut Accumulator, record: &TelemetryRecord, allow: &AllowLists) {
    let version = (!record.version.is_empty()).then_some(record.version.as_str());
    combine_base(
        acc,
        version,
        record.country.as_deref(),
        record.installation_type.into(),
    );

    if let Some(integrations) = &record.integrations {
        if !integrations.is_empty() {
            acc.reports_integrations += 1;
        }
        for domain in integrations {
            bump(&mut acc.integrations, domain);
        }
    }

    for custom in record.custom_integrations.iter().flatten() {
        if !allow.is_custom_integration(&custom.domain) {
            continue;
        }
        let tally = acc.custom_integrations.entry(custom.domain.clone()).or_default();
        tally.total += 1;
        if let Some(version) = &custom.version {
            bump(&mut tally.versions, version);
        }
    }

    if let Some(addons) = &record.addons {
        if !addons.is_empty() {
            acc.reports_addons += 1;
        }
        for addon in addons {
            if addon.slug.starts_with(LOCAL_ADDON_PREFIX) {
                continue;
            }
            let tally = acc.addons.entry(addon.slug.clone()).or_default();
            tally.total += 1;
            if let Some(version) = &addon.version {
                bump(&mut tally.versions, version);
            }
            if addon.protected == Some(true) {
                tally.protected += 1;
            }
            if addon.auto_update == Some(true) {
                tally.auto_update += 1;
            }
        }
    }

    if let Some(os) = &record.operating_system {
        if allow.is_os_board(&os.board) {
            bump(&mut acc.operating_system.boards, &os.board);
            if let Some(version) = &os.version {
                bump(&mut acc.operating_system.versions, version);
            }
        }
    }

    if let Some(supervisor) = &record.supervisor {
        if let Some(arch) = &supervisor.arch {
            bump(&mut acc.supervisor.arch, arch);
        }
        if !supervisor.healthy {
            acc.supervisor.unhealthy += 1;
        }
        if !supervisor.supported {
            acc.supervisor.unsupported += 1;
        }
    }

    push_sample(&mut acc.count_addons, record.addon_count);
    push_sample(&mut acc.count_automations, record.automation_count);
    push_sample(&mut acc.count_integrations, record.integration_count);
    push_sample(&mut acc.count_states, record.state_count);
    push_sample(&mut acc.count_users, record.user_count);
    if record.state_count.is_some() {
        acc.reports_statistics += 1;
    }

    if record.energy.is_some_and(|e| e.configured) {
        acc.energy.count_configured += 1;
    }
}

fn combine_base(
    acc: &mut Accumulator,
    version: Option<&str>,
    country: Option<&str>,
    installation_type: InstallationTypeCode,
) {
    if let Some(version) = version {
        bump(&mut acc.versions, version);
    }
    if let Some(country) = country {
        bump(&mut acc.countries, country);
    }
    acc.installation_types.bump(installation_type);
}

// Zero counts carry no information for the medians.
fn push_sample(samples: &mut Vec<u64>, value: Option<u64>) {
    if let Some(value) = value.filter(|v| *v > 0) {
        samples.push(value);
    }
}
