//! Published analytics document.

use axum::{extract::State, Json};
use domain::models::{keys, AnalyticsSnapshot};
use domain::services::migrate_analytics;

use crate::app::AppState;
use crate::error::{ApiError, PipelineError};

/// Serve the published snapshot, migrated to the current schema.
pub async fn get_analytics(
    State(state): State<AppState>,
) -> Result<Json<AnalyticsSnapshot>, ApiError> {
    let stored = state
        .store
        .get(keys::CORE_ANALYTICS)
        .await?
        .ok_or_else(|| ApiError::NotFound("Analytics have not been published yet".into()))?;

    let snapshot = migrate_analytics(stored).map_err(PipelineError::from)?;
    Ok(Json(snapshot))
}
