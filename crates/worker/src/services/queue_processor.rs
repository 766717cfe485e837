//! Cycle driver.
//!
//! One call to [`QueueProcessor::process_queue`] is one drain invocation:
//! resume or start a cycle, enumerate when the queue is empty, fold a
//! budgeted chunk of full records, and finalize once the queue runs dry.
//! All state between invocations lives in the queue document.

use chrono::{DateTime, Utc};
use domain::models::{
    keys, Accumulator, AllowLists, QueueState, RecordMetadata, TelemetryRecord,
};
use domain::services::{
    build_current, combine_metadata, combine_record, AllowListSource, RebuildTrigger,
    RecordStore, StoreError,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::middleware::metrics::{self, FoldPath};
use crate::services::documents::{load_queue, save_document, save_queue, update_snapshot};

/// Runtime settings of the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub max_process_entries: usize,
    pub list_page_size: usize,
    pub record_prefix: String,
    pub history_version_threshold: u64,
    pub chunk_deadline: Duration,
}

impl From<&PipelineConfig> for PipelineSettings {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            max_process_entries: config.max_process_entries,
            list_page_size: config.list_page_size,
            record_prefix: config.record_prefix.clone(),
            history_version_threshold: config.history_version_threshold,
            chunk_deadline: Duration::from_secs(config.chunk_deadline_secs),
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            max_process_entries: 850,
            list_page_size: 1000,
            record_prefix: keys::RECORD_PREFIX.to_string(),
            history_version_threshold: shared::versions::DEFAULT_RELEASE_THRESHOLD,
            chunk_deadline: Duration::from_secs(25),
        }
    }
}

/// What one drain invocation did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    /// The previous cycle is finalized and not reset yet; nothing was done.
    pub waiting_for_reset: bool,
    /// An in-flight cycle was discarded because of a schema change.
    pub discarded_stale: bool,
    pub enumerated: bool,
    pub list_calls: usize,
    /// Keys folded from metadata alone during enumeration.
    pub folded_metadata: usize,
    /// Keys queued for a full fetch during enumeration.
    pub enqueued: usize,
    /// Full records folded in this chunk.
    pub folded_full: usize,
    /// Popped keys that contributed nothing (missing, corrupt, failed or abandoned).
    pub dropped: usize,
    pub remaining: usize,
    pub finalized: bool,
}

/// Outcome of a reset attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetOutcome {
    Reset,
    /// A cycle is still draining or was never finalized.
    Skipped,
    /// No queue document exists.
    Missing,
}

/// Drives drain cycles over the record store.
#[derive(Clone)]
pub struct QueueProcessor {
    store: Arc<dyn RecordStore>,
    allow_lists: Arc<dyn AllowListSource>,
    rebuild: Arc<dyn RebuildTrigger>,
    settings: PipelineSettings,
}

impl QueueProcessor {
    pub fn new(
        store: Arc<dyn RecordStore>,
        allow_lists: Arc<dyn AllowListSource>,
        rebuild: Arc<dyn RebuildTrigger>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            store,
            allow_lists,
            rebuild,
            settings,
        }
    }

    /// Run one drain invocation.
    pub async fn process_queue(&self) -> Result<DrainReport, PipelineError> {
        self.process_queue_at(Utc::now()).await
    }

    /// Run one drain invocation as of `now`.
    pub async fn process_queue_at(&self, now: DateTime<Utc>) -> Result<DrainReport, PipelineError> {
        let mut report = DrainReport::default();
        let doc = load_queue(self.store.as_ref()).await?;
        let revision = doc.revision;
        let mut queue = doc.state;

        if queue.is_stale() {
            warn!(
                stored = queue.schema_version,
                "Queue schema changed, discarding in-flight cycle"
            );
            queue = QueueState::new();
            report.discarded_stale = true;
        } else if queue.can_reset() {
            info!("Cycle complete, waiting for reset");
            report.waiting_for_reset = true;
            return Ok(report);
        }

        let allow_lists = Arc::new(self.allow_lists.fetch().await?);

        let mut budget = self.settings.max_process_entries;
        if queue.entries.is_empty() {
            self.enumerate(&mut queue, &mut report).await?;
            budget = budget.saturating_sub(report.list_calls);
        }

        let chunk = queue.pop_chunk(budget);
        if !chunk.is_empty() {
            let (partial, folded, dropped) = self.fold_chunk(chunk, allow_lists).await;
            queue.data.merge(partial);
            report.folded_full = folded;
            report.dropped = dropped;
        }

        report.remaining = queue.entries.len();
        metrics::set_queue_depth(report.remaining);

        if queue.entries.is_empty() {
            self.finalize(queue, revision, now).await?;
            report.finalized = true;
        } else {
            save_queue(self.store.as_ref(), &queue, revision).await?;
            info!(
                folded = report.folded_full,
                dropped = report.dropped,
                remaining = report.remaining,
                "Chunk processed"
            );
        }

        Ok(report)
    }

    /// Clear the queue once the previous cycle has fully drained.
    pub async fn reset_queue(&self) -> Result<ResetOutcome, PipelineError> {
        let doc = load_queue(self.store.as_ref()).await?;
        if doc.revision.is_none() {
            debug!("No queue document, nothing to reset");
            return Ok(ResetOutcome::Missing);
        }

        if !doc.state.can_reset() {
            info!(
                phase = %doc.state.phase(),
                entries = doc.state.entries.len(),
                "Queue not finalized, skipping reset"
            );
            return Ok(ResetOutcome::Skipped);
        }

        save_queue(self.store.as_ref(), &QueueState::new(), doc.revision).await?;
        info!("Queue reset");
        Ok(ResetOutcome::Reset)
    }

    /// List the whole record namespace, folding lightweight keys from their
    /// metadata and queueing the rest.
    async fn enumerate(
        &self,
        queue: &mut QueueState,
        report: &mut DrainReport,
    ) -> Result<(), PipelineError> {
        let mut cursor: Option<String> = None;

        loop {
            let page = self
                .store
                .list(
                    &self.settings.record_prefix,
                    cursor.as_deref(),
                    self.settings.list_page_size,
                )
                .await?;
            report.list_calls += 1;

            for key in page.keys {
                match RecordMetadata::from_value(key.metadata.as_ref()) {
                    Some(meta) if meta.is_lightweight() => {
                        combine_metadata(&mut queue.data, &meta);
                        report.folded_metadata += 1;
                    }
                    _ => queue.entries.push(key.name),
                }
            }

            if page.complete || page.cursor.is_none() {
                break;
            }
            cursor = page.cursor;
        }

        report.enumerated = true;
        report.enqueued = queue.entries.len();
        metrics::record_records_folded(FoldPath::Metadata, report.folded_metadata);
        info!(
            list_calls = report.list_calls,
            folded_metadata = report.folded_metadata,
            enqueued = report.enqueued,
            "Enumerated records"
        );
        Ok(())
    }

    /// Fetch and fold a chunk of records concurrently under the chunk deadline.
    ///
    /// Keys whose fetch is still in flight at the deadline are abandoned and
    /// not re-queued.
    async fn fold_chunk(
        &self,
        chunk: Vec<String>,
        allow_lists: Arc<AllowLists>,
    ) -> (Accumulator, usize, usize) {
        let total = chunk.len();
        let mut tasks: JoinSet<Result<Option<TelemetryRecord>, StoreError>> = JoinSet::new();

        for key in chunk {
            let store = Arc::clone(&self.store);
            tasks.spawn(async move { fetch_record(store.as_ref(), &key).await });
        }

        let deadline = tokio::time::Instant::now() + self.settings.chunk_deadline;
        let mut partial = Accumulator::new();
        let mut folded = 0;

        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(Ok(Some(record))))) => {
                    combine_record(&mut partial, &record, &allow_lists);
                    folded += 1;
                }
                Ok(Some(Ok(Ok(None)))) => {}
                Ok(Some(Ok(Err(e)))) => {
                    warn!(error = %e, "Record fetch failed, skipping");
                }
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "Record fetch task failed, skipping");
                }
                Ok(None) => break,
                Err(_) => {
                    warn!(
                        abandoned = tasks.len(),
                        "Chunk deadline reached, abandoning in-flight fetches"
                    );
                    tasks.abort_all();
                    metrics::record_records_dropped("deadline", tasks.len());
                    break;
                }
            }
        }

        let dropped = total - folded;
        metrics::record_records_folded(FoldPath::Full, folded);
        (partial, folded, dropped)
    }

    /// Publish the drained accumulator and leave the queue complete.
    async fn finalize(
        &self,
        mut queue: QueueState,
        revision: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<(), PipelineError> {
        let store = self.store.as_ref();
        queue.data.canonicalize();

        let current = build_current(&queue.data, now);

        // Nothing is persisted when the rebuild hook fails.
        self.rebuild.trigger().await?;

        // The snapshot is read after the hook so history points written
        // meanwhile are kept.
        let history_key = keys::history_key(now.timestamp_millis());
        tokio::try_join!(
            update_snapshot(store, |snapshot| snapshot.current = current.clone()),
            save_document(store, keys::CUSTOM_INTEGRATIONS, &queue.data.custom_integrations),
            save_document(store, keys::ADDONS, &queue.data.addons),
            save_document(store, &history_key, &current),
        )?;

        save_queue(store, &QueueState::completed(), revision).await?;

        metrics::record_cycle_finalized(current.active_installations);
        info!(
            active_installations = current.active_installations,
            history_key = %history_key,
            "Cycle finalized"
        );
        Ok(())
    }
}

/// Fetch one record. Missing and undecodable records yield `None`.
async fn fetch_record(
    store: &dyn RecordStore,
    key: &str,
) -> Result<Option<TelemetryRecord>, StoreError> {
    let Some(value) = store.get(key).await? else {
        debug!(key = %key, "Record vanished before fetch");
        metrics::record_records_dropped("missing", 1);
        return Ok(None);
    };

    match serde_json::from_value::<TelemetryRecord>(value) {
        Ok(record) => Ok(Some(record)),
        Err(e) => {
            warn!(key = %key, error = %e, "Corrupt record, skipping");
            metrics::record_records_dropped("corrupt", 1);
            Ok(None)
        }
    }
}
