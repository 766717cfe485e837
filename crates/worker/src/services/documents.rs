//! Typed access to the pipeline's own documents.

use domain::models::{keys, AnalyticsSnapshot, QueueState, ANALYTICS_SCHEMA_VERSION};
use domain::services::{migrate_analytics, needs_migration, PutOptions, RecordStore};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PipelineError;

/// The queue document together with the revision it was read at.
#[derive(Debug, Clone)]
pub struct QueueDocument {
    pub state: QueueState,
    /// `None` when no queue document exists yet.
    pub revision: Option<i64>,
}

/// Read the queue document.
///
/// A missing document yields a fresh queue. A document that no longer
/// decodes is reported with schema version 0 so the caller re-enumerates.
pub async fn load_queue(store: &dyn RecordStore) -> Result<QueueDocument, PipelineError> {
    let Some(stored) = store.get_versioned(keys::QUEUE).await? else {
        return Ok(QueueDocument {
            state: QueueState::new(),
            revision: None,
        });
    };

    let state = match serde_json::from_value::<QueueState>(stored.value) {
        Ok(state) => state,
        Err(e) => {
            warn!(error = %e, "Queue document does not decode, treating it as stale");
            QueueState {
                schema_version: 0,
                ..QueueState::new()
            }
        }
    };

    Ok(QueueDocument {
        state,
        revision: Some(stored.revision),
    })
}

/// Write the queue document if nobody else wrote it since `revision`.
pub async fn save_queue(
    store: &dyn RecordStore,
    state: &QueueState,
    revision: Option<i64>,
) -> Result<(), PipelineError> {
    let value = to_value(keys::QUEUE, state)?;
    if store.put_if_revision(keys::QUEUE, value, revision).await? {
        Ok(())
    } else {
        Err(PipelineError::QueueConflict)
    }
}

/// Guarded snapshot writes attempted before giving up.
const SNAPSHOT_WRITE_ATTEMPTS: usize = 3;

/// The published snapshot together with the revision it was read at.
#[derive(Debug, Clone)]
pub struct SnapshotDocument {
    pub snapshot: AnalyticsSnapshot,
    /// `None` when nothing has been published yet.
    pub revision: Option<i64>,
}

/// Read the published snapshot, migrated to the current schema.
pub async fn load_snapshot(store: &dyn RecordStore) -> Result<SnapshotDocument, PipelineError> {
    let Some(stored) = store.get_versioned(keys::CORE_ANALYTICS).await? else {
        return Ok(SnapshotDocument {
            snapshot: AnalyticsSnapshot::new(),
            revision: None,
        });
    };

    if needs_migration(&stored.value) {
        debug!(
            target_version = ANALYTICS_SCHEMA_VERSION,
            "Migrating published snapshot"
        );
    }

    Ok(SnapshotDocument {
        snapshot: migrate_analytics(stored.value)?,
        revision: Some(stored.revision),
    })
}

/// Apply `change` to the published snapshot and write it back.
///
/// The write only lands if nobody wrote the snapshot since it was read.
/// On a conflict the snapshot is read again and `change` re-applied.
pub async fn update_snapshot<F>(
    store: &dyn RecordStore,
    mut change: F,
) -> Result<AnalyticsSnapshot, PipelineError>
where
    F: FnMut(&mut AnalyticsSnapshot) + Send,
{
    for attempt in 1..=SNAPSHOT_WRITE_ATTEMPTS {
        let SnapshotDocument {
            mut snapshot,
            revision,
        } = load_snapshot(store).await?;
        change(&mut snapshot);

        let value = to_value(keys::CORE_ANALYTICS, &snapshot)?;
        if store
            .put_if_revision(keys::CORE_ANALYTICS, value, revision)
            .await?
        {
            return Ok(snapshot);
        }
        warn!(attempt, "Published snapshot changed concurrently, re-reading");
    }

    Err(PipelineError::SnapshotConflict)
}

/// Serialize and write a document without metadata or expiry.
pub async fn save_document<T: Serialize + ?Sized>(
    store: &dyn RecordStore,
    key: &str,
    document: &T,
) -> Result<(), PipelineError> {
    let value = to_value(key, document)?;
    store.put(key, value, PutOptions::default()).await?;
    Ok(())
}

fn to_value<T: Serialize + ?Sized>(key: &str, document: &T) -> Result<serde_json::Value, PipelineError> {
    serde_json::to_value(document).map_err(|source| PipelineError::MalformedDocument {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::models::ANALYTICS_SCHEMA_VERSION;
    use domain::services::{InMemoryRecordStore, StoreError};
    use serde_json::json;

    #[tokio::test]
    async fn test_load_missing_queue() {
        let store = InMemoryRecordStore::new();
        let doc = load_queue(&store).await.unwrap();
        assert_eq!(doc.state, QueueState::new());
        assert_eq!(doc.revision, None);
    }

    #[tokio::test]
    async fn test_undecodable_queue_is_stale() {
        let store = InMemoryRecordStore::new();
        store
            .put(keys::QUEUE, json!({"entries": "nope"}), PutOptions::default())
            .await
            .unwrap();

        let doc = load_queue(&store).await.unwrap();
        assert!(doc.state.is_stale());
        assert_eq!(doc.revision, Some(1));
    }

    #[tokio::test]
    async fn test_save_queue_detects_conflict() {
        let store = InMemoryRecordStore::new();
        save_queue(&store, &QueueState::new(), None).await.unwrap();

        let doc = load_queue(&store).await.unwrap();
        save_queue(&store, &QueueState::completed(), doc.revision)
            .await
            .unwrap();

        let err = save_queue(&store, &QueueState::new(), doc.revision)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::QueueConflict));
    }

    #[tokio::test]
    async fn test_load_snapshot_migrates() {
        let store = InMemoryRecordStore::new();
        store
            .put(
                keys::CORE_ANALYTICS,
                json!({"1": {"active_installations": 3}, "2": {"active_installations": 4}}),
                PutOptions::default(),
            )
            .await
            .unwrap();

        let doc = load_snapshot(&store).await.unwrap();
        assert_eq!(doc.revision, Some(1));
        let snapshot = doc.snapshot;
        assert_eq!(snapshot.schema_version, ANALYTICS_SCHEMA_VERSION);
        assert_eq!(snapshot.current.active_installations, 4);
        assert_eq!(snapshot.history.len(), 1);
    }

    #[tokio::test]
    async fn test_load_snapshot_rejects_garbage() {
        let store = InMemoryRecordStore::new();
        store
            .put(keys::CORE_ANALYTICS, json!([1, 2, 3]), PutOptions::default())
            .await
            .unwrap();

        assert!(matches!(
            load_snapshot(&store).await,
            Err(PipelineError::Migration(_))
        ));
    }

    #[tokio::test]
    async fn test_update_snapshot_creates_and_bumps_revision() {
        let store = InMemoryRecordStore::new();

        let first = update_snapshot(&store, |s| s.current.active_installations = 3)
            .await
            .unwrap();
        assert_eq!(first.current.active_installations, 3);

        update_snapshot(&store, |s| s.current.active_installations += 1)
            .await
            .unwrap();

        let doc = load_snapshot(&store).await.unwrap();
        assert_eq!(doc.revision, Some(2));
        assert_eq!(doc.snapshot.current.active_installations, 4);
    }

    #[tokio::test]
    async fn test_update_snapshot_propagates_store_outage() {
        let store = InMemoryRecordStore::new();
        store.set_unavailable(true);

        let err = update_snapshot(&store, |_| {}).await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(StoreError::Unavailable(_))));
    }
}
