//! Store metrics collection.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record the duration of one store query.
pub fn record_query_duration(query_name: &str, duration_secs: f64) {
    histogram!(
        "invite_store_query_duration_seconds",
        "query" => query_name.to_string()
    )
    .record(duration_secs);
}

/// Record connection pool gauges. Called periodically by the pool metrics
/// job.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("invite_store_connections_active").set(active as f64);
    gauge!("invite_store_connections_idle").set(idle as f64);
    gauge!("invite_store_connections_total").set(size as f64);
}

/// Times one store operation and records it on `record()`.
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.start.elapsed().as_secs_f64());
    }
}
