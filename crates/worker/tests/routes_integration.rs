//! Integration tests for the HTTP surface.

mod common;

use axum::http::StatusCode;
use common::*;
use domain::models::{keys, ANALYTICS_SCHEMA_VERSION, QUEUE_SCHEMA_VERSION};
use domain::services::{InMemoryRecordStore, MockRebuildTrigger, PutOptions, RecordStore};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

#[tokio::test]
async fn test_live() {
    let app = create_test_app(Arc::new(InMemoryRecordStore::new()));

    let response = app.oneshot(get_request("/api/health/live")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await["status"], "alive");
}

#[tokio::test]
async fn test_health_reports_store() {
    let app = create_test_app(Arc::new(InMemoryRecordStore::new()));

    let response = app.oneshot(get_request("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"]["connected"], true);
}

#[tokio::test]
async fn test_ready_fails_when_store_is_down() {
    let store = Arc::new(InMemoryRecordStore::new());
    store.set_unavailable(true);
    let app = create_test_app(store);

    let response = app.oneshot(get_request("/api/health/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_analytics_not_published() {
    let app = create_test_app(Arc::new(InMemoryRecordStore::new()));

    let response = app.oneshot(get_request("/api/v1/analytics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(parse_response_body(response).await["error"], "not_found");
}

#[tokio::test]
async fn test_analytics_served_after_cycle() {
    let store = Arc::new(InMemoryRecordStore::new());
    seed_lightweight(&store, 0, 25).await;
    processor(Arc::clone(&store), Arc::new(MockRebuildTrigger::new()))
        .process_queue()
        .await
        .unwrap();

    let app = create_test_app(store);
    let response = app.oneshot(get_request("/api/v1/analytics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["schema_version"], ANALYTICS_SCHEMA_VERSION);
    assert_eq!(body["current"]["active_installations"], 25);
}

#[tokio::test]
async fn test_analytics_migrates_legacy_document() {
    let store = Arc::new(InMemoryRecordStore::new());
    store
        .put(
            keys::CORE_ANALYTICS,
            json!({"1000": {"active_installations": 2}, "2000": {"active_installations": 9}}),
            PutOptions::default(),
        )
        .await
        .unwrap();

    let app = create_test_app(store);
    let response = app.oneshot(get_request("/api/v1/analytics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = parse_response_body(response).await;
    assert_eq!(body["schema_version"], ANALYTICS_SCHEMA_VERSION);
    assert_eq!(body["current"]["active_installations"], 9);
    assert_eq!(body["history"][0]["timestamp"], "1000");
}

#[tokio::test]
async fn test_queue_status() {
    let store = Arc::new(InMemoryRecordStore::new());
    let app = create_test_app(Arc::clone(&store));

    let response = app.oneshot(get_request("/api/v1/queue")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["phase"], "empty");
    assert_eq!(body["expected_schema_version"], QUEUE_SCHEMA_VERSION);

    seed_full(&store, 0, 1000).await;
    processor(Arc::clone(&store), Arc::new(MockRebuildTrigger::new()))
        .process_queue()
        .await
        .unwrap();

    let app = create_test_app(store);
    let response = app.oneshot(get_request("/api/v1/queue")).await.unwrap();
    let body = parse_response_body(response).await;
    assert_eq!(body["phase"], "draining");
    assert_eq!(body["pending_entries"], 151);
    assert_eq!(body["folded_installations"], 849);
}
