//! Record store abstraction.
//!
//! A key/value store with side metadata, cursor-paginated prefix listings
//! and a revision counter per key for guarded writes.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use shared::pagination::{decode_cursor, encode_cursor, CursorError};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors returned by a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A value together with its side metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub value: Value,
    pub metadata: Option<Value>,
}

/// A value together with its revision.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned {
    pub value: Value,
    pub revision: i64,
}

/// Options for [`RecordStore::put`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PutOptions {
    pub metadata: Option<Value>,
    /// Absolute expiry, seconds since epoch.
    pub expiration: Option<i64>,
    /// Relative expiry in seconds, used when `expiration` is not set.
    pub expiration_ttl: Option<u64>,
}

impl PutOptions {
    pub fn with_metadata(metadata: Value) -> Self {
        Self {
            metadata: Some(metadata),
            ..Default::default()
        }
    }

    /// Absolute expiry in seconds since epoch, if any.
    pub fn expires_at(&self, now_secs: i64) -> Option<i64> {
        self.expiration.or_else(|| {
            self.expiration_ttl
                .map(|ttl| now_secs.saturating_add(ttl as i64))
        })
    }
}

/// One key of a listing page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListKey {
    pub name: String,
    pub metadata: Option<Value>,
    /// Expiry in seconds since epoch.
    pub expiration: Option<i64>,
}

/// One page of a prefix listing.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListPage {
    pub keys: Vec<ListKey>,
    /// Resume token; present when `complete` is false.
    pub cursor: Option<String>,
    pub complete: bool,
}

/// Record store trait.
///
/// Expired entries are invisible to every read and listing.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn get_with_metadata(&self, key: &str) -> Result<Option<StoredValue>, StoreError>;

    /// Write a value, replacing any previous value and metadata.
    async fn put(&self, key: &str, value: Value, options: PutOptions) -> Result<(), StoreError>;

    /// Returns whether a value was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// List keys starting with `prefix`, in key order.
    async fn list(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<ListPage, StoreError>;

    async fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, StoreError>;

    /// Write only if the stored revision still equals `expected`.
    ///
    /// `None` means the key must not exist yet; an expired entry counts as
    /// absent. Returns false when another writer got there first.
    async fn put_if_revision(
        &self,
        key: &str,
        value: Value,
        expected: Option<i64>,
    ) -> Result<bool, StoreError>;

    /// Remove expired entries, returning how many were removed.
    async fn purge_expired(&self) -> Result<u64, StoreError>;
}

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: Value,
    metadata: Option<Value>,
    revision: i64,
    expires_at: Option<i64>,
}

impl MemoryEntry {
    fn is_live(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// In-memory record store for development and testing.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    entries: RwLock<BTreeMap<String, MemoryEntry>>,
    unavailable: AtomicBool,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every operation fails while set.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of `list` calls served so far.
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    /// Number of value reads (`get`, `get_with_metadata`, `get_versioned`) served so far.
    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Number of writes (`put`, `put_if_revision`) served so far.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Keys currently stored, expired ones included.
    pub async fn keys(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    /// Raw metadata of a key, bypassing expiry.
    pub async fn metadata_of(&self, key: &str) -> Option<Value> {
        self.entries
            .read()
            .await
            .get(key)
            .and_then(|e| e.metadata.clone())
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }

    async fn live_entry(&self, key: &str) -> Option<MemoryEntry> {
        let now = Utc::now().timestamp();
        self.entries
            .read()
            .await
            .get(key)
            .filter(|e| e.is_live(now))
            .cloned()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.check()?;
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.live_entry(key).await.map(|e| e.value))
    }

    async fn get_with_metadata(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        self.check()?;
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.live_entry(key).await.map(|e| StoredValue {
            value: e.value,
            metadata: e.metadata,
        }))
    }

    async fn put(&self, key: &str, value: Value, options: PutOptions) -> Result<(), StoreError> {
        self.check()?;
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now().timestamp();
        let mut entries = self.entries.write().await;
        let revision = entries.get(key).map_or(1, |e| e.revision + 1);
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                expires_at: options.expires_at(now),
                metadata: options.metadata,
                revision,
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn list(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<ListPage, StoreError> {
        self.check()?;
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        let after = cursor.map(decode_cursor).transpose()?;
        let now = Utc::now().timestamp();
        let limit = limit.max(1);
        let entries = self.entries.read().await;

        let mut matching = entries
            .range(prefix.to_string()..)
            .take_while(|(name, _)| name.starts_with(prefix))
            .filter(|(name, _)| after.as_deref().map_or(true, |after| name.as_str() > after))
            .filter(|(_, entry)| entry.is_live(now))
            .map(|(name, entry)| ListKey {
                name: name.clone(),
                metadata: entry.metadata.clone(),
                expiration: entry.expires_at,
            });

        let keys: Vec<ListKey> = matching.by_ref().take(limit).collect();
        let complete = matching.next().is_none();
        let cursor = if complete {
            None
        } else {
            keys.last().map(|k| encode_cursor(&k.name))
        };

        Ok(ListPage {
            keys,
            cursor,
            complete,
        })
    }

    async fn get_versioned(&self, key: &str) -> Result<Option<Versioned>, StoreError> {
        self.check()?;
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.live_entry(key).await.map(|e| Versioned {
            value: e.value,
            revision: e.revision,
        }))
    }

    async fn put_if_revision(
        &self,
        key: &str,
        value: Value,
        expected: Option<i64>,
    ) -> Result<bool, StoreError> {
        self.check()?;
        let now = Utc::now().timestamp();
        let mut entries = self.entries.write().await;
        let existing = entries.get(key);
        // An expired entry counts as absent but keeps the revision sequence.
        let live = existing.filter(|e| e.is_live(now)).map(|e| e.revision);
        if live != expected {
            return Ok(false);
        }
        let revision = existing.map_or(1, |e| e.revision + 1);

        self.put_calls.fetch_add(1, Ordering::SeqCst);
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value,
                metadata: None,
                revision,
                expires_at: None,
            },
        );
        Ok(true)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.check()?;
        let now = Utc::now().timestamp();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        Ok((before - entries.len()) as u64)
    }
}
