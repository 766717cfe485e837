//! Health check endpoint handlers.

use axum::{extract::State, http::StatusCode, Json};
use domain::models::keys;
use serde::Serialize;

use crate::app::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: StoreHealth,
    pub rebuild_hook_configured: bool,
}

/// Record store health status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct StoreHealth {
    pub connected: bool,
    pub latency_ms: Option<u64>,
}

/// Simple status response for liveness/readiness probes.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: String,
}

/// Probe the record store with a cheap read.
async fn probe_store(state: &AppState) -> StoreHealth {
    let start = std::time::Instant::now();
    let connected = state.store.get(keys::QUEUE).await.is_ok();
    let latency_ms = start.elapsed().as_millis() as u64;

    if let Some(pool) = &state.pool {
        persistence::metrics::record_pool_metrics(pool);
    }

    StoreHealth {
        connected,
        latency_ms: connected.then_some(latency_ms),
    }
}

/// Full health check endpoint.
pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let store = probe_store(&state).await;
    if !store.connected {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store,
        rebuild_hook_configured: !state.config.endpoints.rebuild_hook_url.is_empty(),
    }))
}

/// Liveness probe endpoint.
///
/// Returns 200 OK if the process is running.
pub async fn live() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "alive".to_string(),
    })
}

/// Readiness probe endpoint.
///
/// Returns 200 OK once the record store answers.
pub async fn ready(State(state): State<AppState>) -> Result<Json<StatusResponse>, StatusCode> {
    if probe_store(&state).await.connected {
        Ok(Json(StatusResponse {
            status: "ready".to_string(),
        }))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}
