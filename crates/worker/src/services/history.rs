//! History snapshotter.
//!
//! Recomputes the coarse distribution of the whole population from record
//! metadata alone and refreshes the current history point. Records without
//! usable metadata are read once and given metadata so later passes stay on
//! the fast path.

use chrono::{DateTime, Utc};
use domain::models::{Accumulator, RecordMetadata, TelemetryRecord};
use domain::services::{
    combine_metadata, history_point, refresh_current, ListKey, PutOptions, RecordStore,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::middleware::metrics::{self, FoldPath};
use crate::services::documents::update_snapshot;
use crate::services::queue_processor::PipelineSettings;

/// What one snapshotter run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HistoryReport {
    pub list_calls: usize,
    pub folded: usize,
    /// Records that were given synthesized metadata.
    pub healed: usize,
    /// Records skipped because they were missing or corrupt.
    pub skipped: usize,
    pub active_installations: u64,
    pub period: String,
}

#[derive(Clone)]
pub struct HistorySnapshotter {
    store: Arc<dyn RecordStore>,
    settings: PipelineSettings,
}

impl HistorySnapshotter {
    pub fn new(store: Arc<dyn RecordStore>, settings: PipelineSettings) -> Self {
        Self { store, settings }
    }

    pub async fn update_history(&self) -> Result<HistoryReport, PipelineError> {
        self.update_history_at(Utc::now()).await
    }

    pub async fn update_history_at(&self, now: DateTime<Utc>) -> Result<HistoryReport, PipelineError> {
        let store = self.store.as_ref();
        let mut report = HistoryReport::default();
        let mut acc = Accumulator::new();
        let mut cursor: Option<String> = None;

        loop {
            let page = store
                .list(
                    &self.settings.record_prefix,
                    cursor.as_deref(),
                    self.settings.list_page_size,
                )
                .await?;
            report.list_calls += 1;

            for key in page.keys {
                let metadata = match RecordMetadata::from_value(key.metadata.as_ref()) {
                    Some(meta) => Some(meta),
                    None => {
                        let healed = self.heal(&key, now).await?;
                        if healed.is_some() {
                            report.healed += 1;
                        }
                        healed
                    }
                };

                match metadata {
                    Some(meta) => {
                        combine_metadata(&mut acc, &meta);
                        report.folded += 1;
                    }
                    None => report.skipped += 1,
                }
            }

            if page.complete || page.cursor.is_none() {
                break;
            }
            cursor = page.cursor;
        }

        let point = history_point(&acc, now, self.settings.history_version_threshold);
        report.period = point.timestamp.clone();
        report.active_installations = point.active_installations;

        update_snapshot(store, |snapshot| {
            refresh_current(&mut snapshot.current, &acc, now);
            snapshot.upsert_history(point.clone());
        })
        .await?;

        metrics::record_records_folded(FoldPath::Metadata, report.folded);
        info!(
            folded = report.folded,
            healed = report.healed,
            skipped = report.skipped,
            active_installations = report.active_installations,
            period = %report.period,
            "History updated"
        );
        Ok(report)
    }

    /// Read a record in full and write it back with synthesized metadata.
    ///
    /// Returns `None` when the record is gone or does not decode. The
    /// record keeps its expiry.
    async fn heal(
        &self,
        key: &ListKey,
        now: DateTime<Utc>,
    ) -> Result<Option<RecordMetadata>, PipelineError> {
        let store = self.store.as_ref();
        let Some(stored) = store.get_with_metadata(&key.name).await? else {
            return Ok(None);
        };

        let record = match serde_json::from_value::<TelemetryRecord>(stored.value.clone()) {
            Ok(record) => record,
            Err(e) => {
                warn!(key = %key.name, error = %e, "Corrupt record, skipping");
                return Ok(None);
            }
        };

        let previous = RecordMetadata::from_value(stored.metadata.as_ref());
        let metadata = RecordMetadata::for_record(&record, now.timestamp_millis(), previous.as_ref());
        let encoded = serde_json::to_value(&metadata).map_err(|source| {
            PipelineError::MalformedDocument {
                key: key.name.clone(),
                source,
            }
        })?;

        store
            .put(
                &key.name,
                stored.value,
                PutOptions {
                    metadata: Some(encoded),
                    expiration: key.expiration,
                    expiration_ttl: None,
                },
            )
            .await?;

        Ok(Some(metadata))
    }
}
