//! Schema migration of the published analytics document.
//!
//! Migration is pure: it never touches storage, and migrating a document
//! that is already current returns it unchanged.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::models::{AnalyticsSnapshot, ANALYTICS_SCHEMA_VERSION};

/// Errors that can occur while migrating a stored snapshot.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Unexpected document shape: {0}")]
    UnexpectedShape(String),

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),
}

/// Bring any stored analytics document to the current schema.
///
/// Accepted inputs:
/// - nothing (`null` or `{}`): an empty snapshot
/// - the unversioned flat map of `timestamp -> snapshot`
/// - any versioned `{current, history}` document
pub fn migrate_analytics(data: Value) -> Result<AnalyticsSnapshot, MigrationError> {
    let mut doc = match data {
        Value::Null => return Ok(AnalyticsSnapshot::new()),
        Value::Object(map) if map.is_empty() => return Ok(AnalyticsSnapshot::new()),
        Value::Object(map) => map,
        other => {
            return Err(MigrationError::UnexpectedShape(format!(
                "expected an object, found {}",
                kind_of(&other)
            )))
        }
    };

    let version = match schema_version(&doc) {
        Some(version) => version,
        None => {
            doc = from_flat_map(doc);
            2
        }
    };

    if version < 2 {
        migrate_v2(&mut doc);
    }
    if version < 3 {
        migrate_v3(&mut doc);
    }

    if version < u64::from(ANALYTICS_SCHEMA_VERSION) {
        doc.insert("schema_version".into(), json!(ANALYTICS_SCHEMA_VERSION));
    }

    Ok(serde_json::from_value(Value::Object(doc))?)
}

/// Whether a stored document needs migrating before use.
pub fn needs_migration(data: &Value) -> bool {
    data.as_object()
        .and_then(schema_version)
        .map_or(true, |v| v < u64::from(ANALYTICS_SCHEMA_VERSION))
}

fn schema_version(doc: &Map<String, Value>) -> Option<u64> {
    doc.get("schema_version")
        .and_then(Value::as_u64)
        .filter(|v| *v > 0)
}

/// Convert the unversioned `timestamp -> snapshot` map.
///
/// The chronologically last entry becomes `current`; earlier entries become
/// the history, sorted ascending.
fn from_flat_map(map: Map<String, Value>) -> Map<String, Value> {
    let mut entries: Vec<(String, Value)> = map
        .into_iter()
        .filter(|(_, value)| value.is_object())
        .collect();
    entries.sort_by(|(a, _), (b, _)| match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    });

    let mut current = entries
        .pop()
        .map(|(_, value)| value)
        .unwrap_or_else(|| json!({}));
    let active = current
        .get("active_installations")
        .cloned()
        .unwrap_or_else(|| json!(0));
    if let Some(current) = current.as_object_mut() {
        current.insert("extended_data_from".into(), active);
    }

    let history: Vec<Value> = entries
        .into_iter()
        .map(|(timestamp, entry)| {
            let mut point = Map::new();
            point.insert("timestamp".into(), json!(timestamp));
            for field in ["active_installations", "installation_types"] {
                if let Some(value) = entry.get(field) {
                    point.insert(field.into(), value.clone());
                }
            }
            Value::Object(point)
        })
        .collect();

    let mut doc = Map::new();
    doc.insert("schema_version".into(), json!(2));
    doc.insert("current".into(), current);
    doc.insert("history".into(), Value::Array(history));
    doc
}

/// v2: `current` and `history` are always present.
fn migrate_v2(doc: &mut Map<String, Value>) {
    if !doc.get("current").is_some_and(Value::is_object) {
        doc.insert("current".into(), json!({}));
    }
    if !doc.get("history").is_some_and(Value::is_array) {
        doc.insert("history".into(), json!([]));
    }
}

/// v3: add-on reporting, supervisor and energy figures.
fn migrate_v3(doc: &mut Map<String, Value>) {
    migrate_v2(doc);
    if let Some(current) = doc.get_mut("current").and_then(Value::as_object_mut) {
        current.entry("reports_addons").or_insert_with(|| json!(0));
        current
            .entry("supervisor")
            .or_insert_with(|| json!({"arch": {}, "unhealthy": 0, "unsupported": 0}));
        current
            .entry("energy")
            .or_insert_with(|| json!({"count_configured": 0}));
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
