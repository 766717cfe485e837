//! PostgreSQL-backed record store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::services::{
    ListKey, ListPage, PutOptions, RecordStore, StoreError, StoredValue, Versioned,
};
use serde_json::Value;
use shared::pagination::{decode_cursor, encode_cursor};
use sqlx::PgPool;

use crate::entities::{KvEntryEntity, KvListingEntity, KvRevisionEntity};
use crate::metrics::QueryTimer;

/// Record store over the kv_entries table.
#[derive(Clone)]
pub struct PgRecordStore {
    pool: PgPool,
}

impl PgRecordStore {
    /// Creates a new record store with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_entry(&self, key: &str) -> Result<Option<KvEntryEntity>, StoreError> {
        let timer = QueryTimer::new("kv_get");
        let result = sqlx::query_as::<_, KvEntryEntity>(
            r#"
            SELECT key, value, metadata, revision, expires_at, updated_at
            FROM kv_entries
            WHERE key = $1
              AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result.map_err(store_error)
    }
}

fn store_error(err: sqlx::Error) -> StoreError {
    tracing::error!(error = %err, "Record store query failed");
    StoreError::Unavailable(err.to_string())
}

/// Escapes LIKE wildcards so a prefix matches literally.
fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn to_timestamp(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

#[async_trait]
impl RecordStore for PgRecordStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.fetch_entry(key).await?.map(|e| e.value))
    }

    async fn get_with_metadata(&self, key: &str) -> Result<Option<StoredValue>, StoreError> {
        Ok(self.fetch_entry(key).await?.map(|e| StoredValue {
            value: e.value,
            metadata: e.metadata,
        }))
    }

    async fn put(&self, key: &str, value: Value, options: PutOptions) -> Result<(), StoreError> {
        let expires_at = options
            .expires_at(Utc::now().timestamp())
            .and_then(to_timestamp);

        let timer = QueryTimer::new("kv_put");
        let result = sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, metadata, revision, expires_at, updated_at)
            VALUES ($1, $2, $3, 1, $4, NOW())
            ON CONFLICT (key) DO UPDATE
            SET value = EXCLUDED.value,
                metadata = EXCLUDED.metadata,
                expires_at = EXCLUDED.expires_at,
                revision = kv_entries.revision + 1,
                updated_at = NOW()
            "#,
        )
        .bind(key)
        .bind(&value)
        .bind(&options.metadata)
        .bind(expires_at)
        .execute(&self.pool)
        .await;
        timer.record();

        result.map_err(store_error)?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("kv_delete");
        let result = sqlx::query("DELETE FROM kv_entries WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await;
        timer.record();

        Ok(result.map_err(store_error)?.rows_affected() > 0)
    }

    async fn list(
        &self,
        prefix: &str,
        cursor: Option<&str>,
        limit: usize,
    ) -> Result<ListPage, StoreError> {
        let after = cursor.map(decode_cursor).transpose()?;
        let limit = limit.max(1);

        let timer = QueryTimer::new("kv_list");
        let result = sqlx::query_as::<_, KvListingEntity>(
            r#"
            SELECT key, metadata, expires_at
            FROM kv_entries
            WHERE key LIKE $1 ESCAPE '\'
              AND ($2::TEXT IS NULL OR key > $2)
              AND (expires_at IS NULL OR expires_at > NOW())
            ORDER BY key
            LIMIT $3
            "#,
        )
        .bind(escape_like(prefix))
        .bind(after)
        .bind((limit + 1) as i64)
        .fetch_all(&self.pool)
        .await;
        timer.record();

        let mut rows = result.map_err(store_error)?;
        let complete = rows.len() <= limit;
        rows.truncate(limit);

        let keys: Vec<ListKey> = rows
            .into_iter()
            .map(|row| ListKey {
                name: row.key,
                metadata: row.metadata,
                expiration: row.expires_at.map(|at| at.timestamp()),
            })
            .collect();

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
        let timer = QueryTimer::new("kv_get_versioned");
        let result = sqlx::query_as::<_, KvRevisionEntity>(
            r#"
            SELECT value, revision
            FROM kv_entries
            WHERE key = $1
              AND (expires_at IS NULL OR expires_at > NOW())
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.map(|row| Versioned {
            value: row.value,
            revision: row.revision,
        }))
    }

    async fn put_if_revision(
        &self,
        key: &str,
        value: Value,
        expected: Option<i64>,
    ) -> Result<bool, StoreError> {
        let timer = QueryTimer::new("kv_put_if_revision");
        let result = match expected {
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO kv_entries (key, value, revision, updated_at)
                    VALUES ($1, $2, 1, NOW())
                    ON CONFLICT (key) DO UPDATE
                    SET value = EXCLUDED.value,
                        metadata = NULL,
                        expires_at = NULL,
                        revision = kv_entries.revision + 1,
                        updated_at = NOW()
                    WHERE kv_entries.expires_at IS NOT NULL
                      AND kv_entries.expires_at <= NOW()
                    "#,
                )
                .bind(key)
                .bind(&value)
                .execute(&self.pool)
                .await
            }
            Some(revision) => {
                sqlx::query(
                    r#"
                    UPDATE kv_entries
                    SET value = $2,
                        metadata = NULL,
                        expires_at = NULL,
                        revision = revision + 1,
                        updated_at = NOW()
                    WHERE key = $1
                      AND revision = $3
                      AND (expires_at IS NULL OR expires_at > NOW())
                    "#,
                )
                .bind(key)
                .bind(&value)
                .bind(revision)
                .execute(&self.pool)
                .await
            }
        };
        timer.record();

        Ok(result.map_err(store_error)?.rows_affected() == 1)
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let timer = QueryTimer::new("kv_purge_expired");
        let result = sqlx::query(
            r#"
            DELETE FROM kv_entries
            WHERE expires_at IS NOT NULL AND expires_at <= NOW()
            "#,
        )
        .execute(&self.pool)
        .await;
        timer.record();

        Ok(result.map_err(store_error)?.rows_affected())
    }
}
