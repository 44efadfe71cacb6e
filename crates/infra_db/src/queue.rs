//! Durable event queue on the `transaction_events` table
//!
//! Delivery is at-least-once with a lease:
//! - `next` claims the oldest visible unsettled row with
//!   `FOR UPDATE SKIP LOCKED`, bumps `attempts` and hides the row for
//!   `visibility_timeout`
//! - `ack` stamps `settled_at`, after which the row is never claimed again
//! - `nack` moves `visible_at` to the retry instant
//!
//! A consumer that dies mid-delivery simply lets its lease expire, and the
//! row is claimed again on a later poll.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use core_kernel::{DomainPort, EventId, HealthCheckResult, HealthCheckable, PortError, TransactionId};
use domain_ledger::{Delivery, EventProvider, EventSubscription, PublishError, TransactionEvent};

use crate::error::DatabaseError;
use crate::repositories::TransactionKind;

/// Polling and lease settings for the Postgres queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Pause between claims when nothing is deliverable
    pub poll_interval: Duration,
    /// How long a claimed event stays hidden before it can be claimed again
    pub visibility_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            visibility_timeout: Duration::from_secs(30),
        }
    }
}

impl QueueConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_visibility_timeout(mut self, visibility_timeout: Duration) -> Self {
        self.visibility_timeout = visibility_timeout;
        self
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    event_id: Uuid,
    transaction_id: Uuid,
    kind: TransactionKind,
    payload: serde_json::Value,
    emitted_at: DateTime<Utc>,
    attempts: i32,
}

impl TryFrom<EventRow> for Delivery {
    type Error = DatabaseError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let attempt = u32::try_from(row.attempts).map_err(|_| {
            DatabaseError::SerializationError(format!("attempts {} is negative", row.attempts))
        })?;

        Ok(Delivery {
            event: TransactionEvent {
                event_id: EventId::from(row.event_id),
                transaction_id: TransactionId::from(row.transaction_id),
                kind: row.kind.into(),
                emitted_at: row.emitted_at,
                payload: row.payload,
            },
            attempt,
        })
    }
}

/// `EventProvider` backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresEventQueue {
    pool: PgPool,
    config: QueueConfig,
}

impl PostgresEventQueue {
    pub fn new(pool: PgPool) -> Self {
        Self::with_config(pool, QueueConfig::default())
    }

    pub fn with_config(pool: PgPool, config: QueueConfig) -> Self {
        Self { pool, config }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Number of events not yet settled
    pub async fn pending(&self) -> Result<u64, DatabaseError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM transaction_events WHERE settled_at IS NULL",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or_default())
    }
}

impl DomainPort for PostgresEventQueue {}

#[async_trait]
impl HealthCheckable for PostgresEventQueue {
    async fn health_check(&self) -> HealthCheckResult {
        crate::adapters::ping(&self.pool, "postgres-event-queue").await
    }
}

#[async_trait]
impl EventProvider for PostgresEventQueue {
    #[instrument(skip(self, event), fields(event_id = %event.event_id, transaction_id = %event.transaction_id))]
    async fn publish(&self, event: TransactionEvent) -> Result<(), PublishError> {
        if self.pool.is_closed() {
            return Err(PublishError::Closed);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO transaction_events (
                event_id, transaction_id, kind, payload, emitted_at
            ) VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(Uuid::from(event.event_id))
        .bind(Uuid::from(event.transaction_id))
        .bind(TransactionKind::from(event.kind))
        .bind(&event.payload)
        .bind(event.emitted_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => {
                if done.rows_affected() == 0 {
                    debug!("Event already enqueued");
                }
                Ok(())
            }
            Err(sqlx::Error::PoolClosed) => Err(PublishError::Closed),
            Err(e) => Err(PublishError::Rejected {
                reason: DatabaseError::from(e).to_string(),
            }),
        }
    }

    async fn subscribe(&self) -> Result<Box<dyn EventSubscription>, PortError> {
        if self.pool.is_closed() {
            return Err(PortError::connection("event queue pool is closed"));
        }

        Ok(Box::new(PostgresSubscription {
            pool: self.pool.clone(),
            config: self.config,
        }))
    }
}

/// A polling lease-based subscription
#[derive(Debug)]
pub struct PostgresSubscription {
    pool: PgPool,
    config: QueueConfig,
}

impl PostgresSubscription {
    async fn claim(&self) -> Result<Option<EventRow>, DatabaseError> {
        let row = sqlx::query_as::<_, EventRow>(
            r#"
            WITH next AS (
                SELECT event_id
                FROM transaction_events
                WHERE settled_at IS NULL AND visible_at <= now()
                ORDER BY sequence
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            UPDATE transaction_events e
            SET attempts = e.attempts + 1,
                visible_at = now() + make_interval(secs => $1)
            FROM next
            WHERE e.event_id = next.event_id
            RETURNING e.event_id, e.transaction_id, e.kind, e.payload, e.emitted_at, e.attempts
            "#,
        )
        .bind(self.config.visibility_timeout.as_secs_f64())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[async_trait]
impl EventSubscription for PostgresSubscription {
    async fn next(&mut self) -> Result<Option<Delivery>, PortError> {
        loop {
            if self.pool.is_closed() {
                return Ok(None);
            }

            match self.claim().await {
                Ok(Some(row)) => return Ok(Some(Delivery::try_from(row)?)),
                Ok(None) => tokio::time::sleep(self.config.poll_interval).await,
                Err(DatabaseError::ConnectionFailed(_)) if self.pool.is_closed() => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    #[instrument(skip(self, delivery), fields(event_id = %delivery.event.event_id, attempt = delivery.attempt))]
    async fn ack(&mut self, delivery: &Delivery) -> Result<(), PortError> {
        let result = sqlx::query(
            "UPDATE transaction_events SET settled_at = COALESCE(settled_at, now()) WHERE event_id = $1",
        )
        .bind(Uuid::from(delivery.event.event_id))
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            return Err(PortError::not_found("TransactionEvent", delivery.event.event_id));
        }
        Ok(())
    }

    #[instrument(skip(self, delivery), fields(event_id = %delivery.event.event_id, attempt = delivery.attempt))]
    async fn nack(&mut self, delivery: &Delivery, retry_in: Duration) -> Result<(), PortError> {
        let attempts = i32::try_from(delivery.attempt)
            .map_err(|_| PortError::validation(format!("attempt {} out of range", delivery.attempt)))?;

        // Fenced on attempts so a stale lease cannot delay a newer claim
        let result = sqlx::query(
            r#"
            UPDATE transaction_events
            SET visible_at = now() + make_interval(secs => $3)
            WHERE event_id = $1 AND attempts = $2 AND settled_at IS NULL
            "#,
        )
        .bind(Uuid::from(delivery.event.event_id))
        .bind(attempts)
        .bind(retry_in.as_secs_f64())
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        if result.rows_affected() == 0 {
            warn!("nack ignored; event was reclaimed or settled");
        }
        Ok(())
    }
}
