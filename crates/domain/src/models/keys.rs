//! Logical keys of the persisted documents.

/// Queue state document.
pub const QUEUE: &str = "queue";
/// Published analytics snapshot.
pub const CORE_ANALYTICS: &str = "core_analytics";
/// Raw custom integration tallies of the last finalized cycle.
pub const CUSTOM_INTEGRATIONS: &str = "custom_integrations";
/// Raw add-on tallies of the last finalized cycle.
pub const ADDONS: &str = "addons";
/// Prefix of the per-cycle history documents.
pub const HISTORY_PREFIX: &str = "history";
/// Default prefix of installation records.
pub const RECORD_PREFIX: &str = "uuid";

/// Key of the history document of a cycle completed at `timestamp_ms`.
pub fn history_key(timestamp_ms: i64) -> String {
    format!("{HISTORY_PREFIX}:{timestamp_ms}")
}

/// Key of the record stored for an installation.
pub fn record_key(prefix: &str, installation_id: &str) -> String {
    format!("{prefix}:{installation_id}")
}
