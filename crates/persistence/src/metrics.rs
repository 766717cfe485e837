//! Record store metrics.
//!
//! Query durations and connection pool gauges.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record the duration of one record store query.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "kv_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Record connection pool gauges. Called from the readiness probe.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// A helper to time database operations and record metrics.
///
/// ```ignore
/// let timer = QueryTimer::new("kv_get");
/// let result = sqlx::query_as::<_, KvEntryEntity>(...).fetch_optional(&pool).await;
/// timer.record();
/// ```
pub struct QueryTimer {
    query_name: String,
    start: Instant,
}

impl QueryTimer {
    /// Create a new timer for the given query name.
    pub fn new(query_name: impl Into<String>) -> Self {
        Self {
            query_name: query_name.into(),
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration to metrics.
    pub fn record(self) {
        let duration = self.start.elapsed().as_secs_f64();
        record_query_duration(&self.query_name, duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_timer_names() {
        assert_eq!(QueryTimer::new("kv_list").query_name, "kv_list");
        assert_eq!(QueryTimer::new(String::from("kv_put")).query_name, "kv_put");
    }

    #[test]
    fn test_record_without_recorder_is_noop() {
        QueryTimer::new("kv_get").record();
        record_query_duration("kv_delete", 0.5);
    }
}
