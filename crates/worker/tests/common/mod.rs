//! Common test utilities for integration tests.
//!
//! Pipeline tests run against the in-memory record store and static
//! collaborator doubles, so no database or network is needed.

#![allow(dead_code)]

use analytics_worker::app::create_app;
use analytics_worker::config::Config;
use analytics_worker::services::{HistorySnapshotter, PipelineSettings, QueueProcessor};
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use domain::models::{keys, AllowLists, QueueState};
use domain::services::{
    InMemoryRecordStore, MockRebuildTrigger, PutOptions, RecordStore, StaticAllowLists,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Custom integration accepted by the test allow-list.
pub const CUSTOM_VALID: &str = "custom_valid";
/// OS board accepted by the test allow-list.
pub const BOARD: &str = "rpi";

pub fn allow_lists() -> StaticAllowLists {
    StaticAllowLists::new(AllowLists::new([CUSTOM_VALID], [BOARD]))
}

pub fn processor_with(
    store: Arc<dyn RecordStore>,
    allow_lists: StaticAllowLists,
    hook: Arc<MockRebuildTrigger>,
    settings: PipelineSettings,
) -> QueueProcessor {
    QueueProcessor::new(store, Arc::new(allow_lists), hook, settings)
}

pub fn processor(store: Arc<InMemoryRecordStore>, hook: Arc<MockRebuildTrigger>) -> QueueProcessor {
    processor_with(store, allow_lists(), hook, PipelineSettings::default())
}

pub fn snapshotter(store: Arc<InMemoryRecordStore>) -> HistorySnapshotter {
    HistorySnapshotter::new(store, PipelineSettings::default())
}

pub fn record_key(i: usize) -> String {
    keys::record_key(keys::RECORD_PREFIX, &format!("{i:06}"))
}

/// Side metadata of a record that shared no optional category.
pub fn lightweight_metadata(type_code: &str, version: &str) -> Value {
    json!({"a": 1, "u": 1, "v": version, "i": type_code, "e": []})
}

/// Side metadata of a record that shared integrations.
pub fn full_metadata(type_code: &str, version: &str) -> Value {
    json!({"a": 1, "u": 1, "v": version, "i": type_code, "e": ["i"]})
}

pub fn full_record(version: &str) -> Value {
    json!({
        "version": version,
        "installation_type": "Home Assistant OS",
        "country": "NO",
        "integrations": ["hue", "mqtt"],
        "custom_integrations": [
            {"domain": CUSTOM_VALID, "version": "1.2.3"},
            {"domain": "custom_unknown", "version": "0.0.1"}
        ],
        "addons": [
            {"slug": "core_ssh", "version": "9.0", "protected": true, "auto_update": false},
            {"slug": "local_thing", "version": "1"}
        ],
        "operating_system": {"board": BOARD, "version": "11.4"},
        "integration_count": 2,
        "state_count": 120,
        "energy": {"configured": true}
    })
}

/// Seed `n` lightweight OS records starting at index `start`.
pub async fn seed_lightweight(store: &InMemoryRecordStore, start: usize, n: usize) {
    for i in start..start + n {
        store
            .put(
                &record_key(i),
                json!({"version": "2024.1.0", "installation_type": "Home Assistant OS"}),
                PutOptions::with_metadata(lightweight_metadata("o", "2024.1.0")),
            )
            .await
            .unwrap();
    }
}

/// Seed `n` full records starting at index `start`.
pub async fn seed_full(store: &InMemoryRecordStore, start: usize, n: usize) {
    for i in start..start + n {
        store
            .put(
                &record_key(i),
                full_record("2024.1.0"),
                PutOptions::with_metadata(full_metadata("o", "2024.1.0")),
            )
            .await
            .unwrap();
    }
}

pub async fn queue_state(store: &InMemoryRecordStore) -> QueueState {
    let value = store.get(keys::QUEUE).await.unwrap().expect("queue document");
    serde_json::from_value(value).unwrap()
}

pub fn test_config() -> Config {
    Config::load_for_test(&[]).expect("test config")
}

/// Router over the given store, without a database pool.
pub fn create_test_app(store: Arc<InMemoryRecordStore>) -> Router {
    create_app(Arc::new(test_config()), store, None)
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn parse_response_body(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap_or(Value::Null)
}
