//! Expired record cleanup job.

use domain::services::RecordStore;
use std::sync::Arc;
use tracing::info;

use super::scheduler::{Job, JobFrequency};
use crate::error::PipelineError;

/// Background job removing store entries past their expiry.
pub struct PurgeExpiredJob {
    store: Arc<dyn RecordStore>,
    minutes: u64,
}

impl PurgeExpiredJob {
    pub fn new(store: Arc<dyn RecordStore>, minutes: u64) -> Self {
        Self { store, minutes }
    }
}

#[async_trait::async_trait]
impl Job for PurgeExpiredJob {
    fn name(&self) -> &'static str {
        "purge_expired"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.minutes)
    }

    async fn execute(&self) -> Result<(), PipelineError> {
        let deleted = self.store.purge_expired().await?;

        if deleted > 0 {
            info!(deleted = deleted, "Purged expired entries");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domain::services::{InMemoryRecordStore, PutOptions, StoreError};
    use serde_json::json;

    #[tokio::test]
    async fn test_purge_expired_job() {
        let store = Arc::new(InMemoryRecordStore::new());
        store
            .put(
                "uuid:old",
                json!({}),
                PutOptions {
                    expiration: Some(Utc::now().timestamp() - 1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        store
            .put("uuid:live", json!({}), PutOptions::default())
            .await
            .unwrap();

        let job = PurgeExpiredJob::new(store.clone(), 60);
        assert_eq!(job.name(), "purge_expired");
        assert_eq!(job.frequency(), JobFrequency::Minutes(60));

        job.execute().await.unwrap();
        assert_eq!(store.keys().await, vec!["uuid:live".to_string()]);
    }

    #[tokio::test]
    async fn test_purge_expired_job_reports_store_failure() {
        let store = Arc::new(InMemoryRecordStore::new());
        store.set_unavailable(true);

        let job = PurgeExpiredJob::new(store, 60);
        let err = job.execute().await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(StoreError::Unavailable(_))));
    }
}
