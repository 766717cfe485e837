//! Key/value entry entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Database row mapping for the kv_entries table.
#[derive(Debug, Clone, FromRow)]
pub struct KvEntryEntity {
    pub key: String,
    pub value: serde_json::Value,
    pub metadata: Option<serde_json::Value>,
    pub revision: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Key listing row (value column omitted).
#[derive(Debug, Clone, FromRow)]
pub struct KvListingEntity {
    pub key: String,
    pub metadata: Option<serde_json::Value>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Value and revision, for guarded writes.
#[derive(Debug, Clone, FromRow)]
pub struct KvRevisionEntity {
    pub value: serde_json::Value,
    pub revision: i64,
}
