//! Ledger settlement worker
//!
//! Drains the durable transaction event queue into the transaction history
//! until interrupted.
//!
//! # Usage
//!
//! ```bash
//! LEDGER_DATABASE_URL=postgres://... cargo run --bin ledger-settlement
//! ```
//!
//! # Environment Variables
//!
//! * `LEDGER_DATABASE_URL` - PostgreSQL connection string (falls back to `DATABASE_URL`)
//! * `LEDGER_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `LEDGER_LOG_LEVEL` - trace, debug, info, warn, error (default: info)
//! * `LEDGER_LOG_FORMAT` - `pretty` or `json` (default: pretty)
//! * `LEDGER_TIMEZONE` - IANA timezone of the business day (default: America/Sao_Paulo)
//! * `LEDGER_CONSUMER_RETRY_BACKOFF_MS` / `LEDGER_CONSUMER_MAX_BACKOFF_MS` - settlement retry timing
//! * `LEDGER_QUEUE_POLL_INTERVAL_MS` / `LEDGER_QUEUE_VISIBILITY_TIMEOUT_SECS` - queue polling and lease

use std::sync::Arc;

use anyhow::Context;

use core_kernel::{AdapterHealth, HealthCheckable};
use infra_db::{
    create_pool, run_migrations, PostgresAccountAdapter, PostgresEventQueue,
    PostgresTransactionHistory,
};
use ledger_service::{init_tracing, Ledger, LedgerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = LedgerConfig::from_env().context("loading ledger configuration")?;
    init_tracing(&config.log_level, config.log_format);

    tracing::info!(
        timezone = %config.timezone,
        max_connections = config.max_connections,
        "Starting ledger settlement worker"
    );

    let pool = create_pool(config.database_config())
        .await
        .context("connecting to database")?;
    run_migrations(&pool).await.context("applying migrations")?;

    let accounts = PostgresAccountAdapter::new(pool.clone());
    let health = accounts.health_check().await;
    if health.status == AdapterHealth::Healthy {
        tracing::info!(latency_ms = health.latency_ms, "Account store healthy");
    } else {
        tracing::warn!(status = ?health.status, message = ?health.message, "Account store degraded");
    }

    let ledger = Ledger::builder(
        Arc::new(accounts),
        Arc::new(PostgresTransactionHistory::new(pool.clone())),
        Arc::new(PostgresEventQueue::with_config(pool.clone(), config.queue_config())),
    )
    .configure(&config)?
    .build();

    let consumer = ledger.consumer().spawn();

    shutdown_signal().await?;

    let stats = consumer.shutdown().await;
    tracing::info!(
        settled = stats.settled,
        duplicates = stats.duplicates,
        failures = stats.failures,
        dropped = stats.dropped,
        "Settlement worker stopped"
    );

    pool.close().await;
    Ok(())
}

/// Waits for Ctrl+C or SIGTERM
async fn shutdown_signal() -> anyhow::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("installing SIGTERM handler")?;

    #[cfg(unix)]
    let terminate = terminate.recv();

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Option<()>>();

    tokio::select! {
        result = ctrl_c => {
            result.context("listening for Ctrl+C")?;
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }

    Ok(())
}
