//! Transaction event pipeline
//!
//! Each committed balance mutation is announced as a `TransactionEvent`.
//! The emitter publishes it without blocking the command; the consumer
//! settles it into the transaction history.
//!
//! ```text
//! command ──emit──▶ EventProvider ──deliver──▶ TransactionConsumer ──append──▶ history
//!                        ▲                              │
//!                        └────────── ack / nack ────────┘
//! ```
//!
//! Delivery is at-least-once and the history append is idempotent on the
//! transaction id, so a redelivered event settles exactly once.

pub mod emitter;
pub mod in_memory;
pub mod consumer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::{EventId, TransactionId};

use crate::transaction::{Transaction, TransactionKind};

pub use emitter::{PublishReceipt, TransactionEmitter};
pub use in_memory::{DeliveryState, InMemoryEventQueue};
pub use consumer::{ConsumerConfig, ConsumerHandle, ConsumerStats, TransactionConsumer};

/// Errors raised while publishing an event
///
/// These never fail the command that produced the transaction.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The transaction could not be encoded
    #[error("Failed to serialize transaction event: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The provider refused the event
    #[error("Event rejected by provider: {reason}")]
    Rejected {
        reason: String,
    },

    /// The provider no longer accepts events
    #[error("Event provider is closed")]
    Closed,

    /// The publishing task ended without reporting an outcome
    #[error("Publish task abandoned before completion")]
    Abandoned,
}

/// Queue message announcing a committed transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub event_id: EventId,
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    pub emitted_at: DateTime<Utc>,
    /// JSON-encoded `Transaction`
    pub payload: serde_json::Value,
}

impl TransactionEvent {
    /// Wraps a transaction in a new event
    pub fn from_transaction(transaction: &Transaction, emitted_at: DateTime<Utc>) -> Result<Self, PublishError> {
        Ok(Self {
            event_id: EventId::new_v7(),
            transaction_id: transaction.id,
            kind: transaction.kind,
            emitted_at,
            payload: serde_json::to_value(transaction)?,
        })
    }

    /// Decodes the carried transaction
    pub fn decode(&self) -> Result<Transaction, serde_json::Error> {
        Transaction::deserialize(&self.payload)
    }
}

/// One delivery of an event to a subscription
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub event: TransactionEvent,
    /// 1 on first delivery, incremented on every redelivery
    pub attempt: u32,
}
