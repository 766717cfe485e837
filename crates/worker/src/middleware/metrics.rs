//! Prometheus metrics.
//!
//! HTTP request metrics, pipeline counters and the `/metrics` export.

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Instant;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Middleware to record HTTP request metrics.
///
/// Records the following metrics:
/// - `http_requests_total`: Counter with labels (method, path, status)
/// - `http_request_duration_seconds`: Histogram with labels (method, path)
pub async fn metrics_middleware(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();
    let method_str = method_to_str(&method);

    counter!(
        "http_requests_total",
        "method" => method_str.to_string(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method_str.to_string(),
        "path" => path
    )
    .record(duration);

    response
}

/// Convert HTTP method to string for metric labels.
fn method_to_str(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        Method::POST => "POST",
        _ => "OTHER",
    }
}

/// How a record was folded into the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldPath {
    Metadata,
    Full,
}

impl FoldPath {
    fn as_str(self) -> &'static str {
        match self {
            FoldPath::Metadata => "metadata",
            FoldPath::Full => "full",
        }
    }
}

/// Count records folded into an accumulator.
pub fn record_records_folded(path: FoldPath, count: usize) {
    counter!("pipeline_records_folded_total", "path" => path.as_str()).increment(count as u64);
}

/// Count records dropped from a cycle (missing, corrupt or abandoned at the deadline).
pub fn record_records_dropped(reason: &'static str, count: usize) {
    if count > 0 {
        counter!("pipeline_records_dropped_total", "reason" => reason).increment(count as u64);
    }
}

pub fn set_queue_depth(depth: usize) {
    gauge!("pipeline_queue_depth").set(depth as f64);
}

pub fn record_cycle_finalized(active_installations: u64) {
    counter!("pipeline_cycles_finalized_total").increment(1);
    gauge!("pipeline_active_installations").set(active_installations as f64);
}

/// Record one scheduled job run.
pub fn record_job_run(job: &str, duration_secs: f64, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    counter!(
        "job_runs_total",
        "job" => job.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("job_duration_seconds", "job" => job.to_string()).record(duration_secs);
}

/// Handler for /metrics endpoint that returns Prometheus text format.
pub async fn metrics_handler() -> impl IntoResponse {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        (
            axum::http::StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
    } else {
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            [(axum::http::header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        )
    }
}

/// Initialize the Prometheus metrics recorder.
///
/// Installs the global recorder once; later calls are no-ops.
pub fn init_metrics() -> Result<(), BuildError> {
    if PROMETHEUS_HANDLE.get().is_some() {
        return Ok(());
    }

    let handle = PrometheusBuilder::new()
        .set_buckets(&[
            0.001, 0.005, 0.01, 0.05, 0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 15.0, 30.0,
        ])?
        .install_recorder()?;

    // A concurrent initializer may have won; its handle serves the same recorder.
    let _ = PROMETHEUS_HANDLE.set(handle);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_to_str() {
        assert_eq!(method_to_str(&Method::GET), "GET");
        assert_eq!(method_to_str(&Method::HEAD), "HEAD");
        assert_eq!(method_to_str(&Method::DELETE), "OTHER");
    }

    #[test]
    fn test_fold_path_labels() {
        assert_eq!(FoldPath::Metadata.as_str(), "metadata");
        assert_eq!(FoldPath::Full.as_str(), "full");
    }

    #[test]
    fn test_pipeline_metrics_without_recorder() {
        record_records_folded(FoldPath::Full, 3);
        record_records_dropped("missing", 0);
        set_queue_depth(10);
        record_job_run("process_queue", 0.25, true);
    }
}
