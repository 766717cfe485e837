//! Queue status.

use axum::{extract::State, Json};
use domain::models::{QueuePhase, QUEUE_SCHEMA_VERSION};
use serde::Serialize;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::documents::load_queue;

#[derive(Debug, Serialize)]
pub struct QueueStatusResponse {
    pub phase: QueuePhase,
    pub pending_entries: usize,
    pub schema_version: u32,
    pub expected_schema_version: u32,
    /// Installations folded into the cycle in progress.
    pub folded_installations: u64,
}

pub async fn get_queue_status(
    State(state): State<AppState>,
) -> Result<Json<QueueStatusResponse>, ApiError> {
    let queue = load_queue(state.store.as_ref()).await?.state;

    Ok(Json(QueueStatusResponse {
        phase: queue.phase(),
        pending_entries: queue.entries.len(),
        schema_version: queue.schema_version,
        expected_schema_version: QUEUE_SCHEMA_VERSION,
        folded_installations: queue.data.active_installations(),
    }))
}
