//! Port adapters backed by PostgreSQL
//!
//! Adapters translate between domain types and repository rows and turn
//! `DatabaseError` into `PortError`, so commands never see SQLx types.

pub mod account;
pub mod history;

pub use account::PostgresAccountAdapter;
pub use history::PostgresTransactionHistory;

use std::time::Instant;

use core_kernel::HealthCheckResult;
use sqlx::PgPool;

/// Runs `SELECT 1` and reports the round trip
pub(crate) async fn ping(pool: &PgPool, adapter_id: &str) -> HealthCheckResult {
    let start = Instant::now();

    let result = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await;

    let latency_ms = start.elapsed().as_millis() as u64;

    match result {
        Ok(_) => HealthCheckResult::healthy(adapter_id, latency_ms),
        Err(e) => HealthCheckResult::unhealthy(adapter_id, latency_ms, format!("Database error: {}", e)),
    }
}
