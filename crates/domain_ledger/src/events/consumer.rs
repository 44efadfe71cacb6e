//! Settlement consumer
//!
//! Drains the event queue into the transaction history. The loop:
//! - decodes each delivery and appends the transaction
//! - acks on insert or duplicate, so redelivery settles exactly once
//! - nacks with exponential backoff when the append fails
//! - acks undecodable payloads after logging them, so they cannot wedge the queue
//! - resubscribes after a subscription error, which replays unacked events

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use core_kernel::PortError;

use super::Delivery;
use crate::ports::{AppendOutcome, EventProvider, EventSubscription, TransactionHistoryPort};

/// Retry timing for the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Delay before the first redelivery of a failed event
    pub retry_backoff: Duration,
    /// Upper bound for any retry delay
    pub max_backoff: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            retry_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl ConsumerConfig {
    /// Delay after the given failed attempt: `retry_backoff * 2^(attempt - 1)`, capped
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.retry_backoff
            .checked_mul(1u32 << exponent)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }
}

/// Snapshot of consumer counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConsumerStats {
    /// Events whose transaction was newly written
    pub settled: u64,
    /// Events whose transaction was already in the history
    pub duplicates: u64,
    /// Failed appends, each followed by a redelivery
    pub failures: u64,
    /// Undecodable events acknowledged without settling
    pub dropped: u64,
}

#[derive(Debug, Default)]
struct Counters {
    settled: AtomicU64,
    duplicates: AtomicU64,
    failures: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> ConsumerStats {
        ConsumerStats {
            settled: self.settled.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// Background consumer that settles transaction events
pub struct TransactionConsumer {
    provider: Arc<dyn EventProvider>,
    history: Arc<dyn TransactionHistoryPort>,
    config: ConsumerConfig,
    counters: Arc<Counters>,
}

impl TransactionConsumer {
    /// Creates a consumer
    ///
    /// # Arguments
    ///
    /// * `provider` - Queue to drain
    /// * `history` - Store the transactions are appended to
    /// * `config` - Retry timing
    pub fn new(
        provider: Arc<dyn EventProvider>,
        history: Arc<dyn TransactionHistoryPort>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            provider,
            history,
            config,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn stats(&self) -> ConsumerStats {
        self.counters.snapshot()
    }

    /// Runs on a background task until the returned handle is shut down
    pub fn spawn(self) -> ConsumerHandle {
        let (shutdown, signal) = watch::channel(false);
        let counters = Arc::clone(&self.counters);
        let join = tokio::spawn(async move { self.listen(signal).await });

        ConsumerHandle {
            shutdown,
            join,
            counters,
        }
    }

    /// Processes deliveries until `shutdown` turns true or its sender is dropped
    ///
    /// Shutdown is honored between deliveries and during any wait; a
    /// delivery being settled is finished first.
    #[instrument(skip_all, name = "transaction_consumer")]
    pub async fn listen(&self, mut shutdown: watch::Receiver<bool>) {
        info!("settlement consumer started");
        let mut reconnects: u32 = 0;

        'subscribe: loop {
            if *shutdown.borrow() {
                break;
            }

            let subscribed = tokio::select! {
                _ = shutdown.changed() => break 'subscribe,
                result = self.provider.subscribe() => result,
            };

            let mut subscription = match subscribed {
                Ok(subscription) => subscription,
                Err(err) => {
                    reconnects = reconnects.saturating_add(1);
                    warn!(error = %err, attempt = reconnects, "failed to subscribe to event queue");
                    if self.pause(&mut shutdown, self.config.backoff_for(reconnects)).await {
                        break;
                    }
                    continue;
                }
            };

            loop {
                let next = tokio::select! {
                    biased;
                    _ = shutdown.changed() => break 'subscribe,
                    next = subscription.next() => next,
                };

                let outcome = match next {
                    Ok(Some(delivery)) => self.settle(subscription.as_mut(), delivery).await,
                    Ok(None) => {
                        info!("event queue closed");
                        break 'subscribe;
                    }
                    Err(err) => Err(err),
                };

                match outcome {
                    Ok(()) => reconnects = 0,
                    Err(err) => {
                        reconnects = reconnects.saturating_add(1);
                        warn!(error = %err, attempt = reconnects, "event subscription failed; resubscribing");
                        drop(subscription);
                        if self.pause(&mut shutdown, self.config.backoff_for(reconnects)).await {
                            break 'subscribe;
                        }
                        continue 'subscribe;
                    }
                }
            }
        }

        info!(stats = ?self.stats(), "settlement consumer stopped");
    }

    /// Settles one delivery; errors only when the queue itself fails
    async fn settle(
        &self,
        subscription: &mut dyn EventSubscription,
        delivery: Delivery,
    ) -> Result<(), PortError> {
        let event_id = delivery.event.event_id;

        let transaction = match delivery.event.decode() {
            Ok(transaction) => transaction,
            Err(err) => {
                error!(%event_id, error = %err, "undecodable transaction event; dropping");
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                return subscription.ack(&delivery).await;
            }
        };

        match self.history.append(&transaction).await {
            Ok(AppendOutcome::Inserted) => {
                self.counters.settled.fetch_add(1, Ordering::Relaxed);
                info!(
                    %event_id,
                    transaction_id = %transaction.id,
                    kind = %transaction.kind,
                    amount = transaction.amount.cents(),
                    "transaction settled"
                );
                subscription.ack(&delivery).await
            }
            Ok(AppendOutcome::Duplicate) => {
                self.counters.duplicates.fetch_add(1, Ordering::Relaxed);
                debug!(%event_id, transaction_id = %transaction.id, "transaction already settled");
                subscription.ack(&delivery).await
            }
            Err(err) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                let retry_in = self.config.backoff_for(delivery.attempt);
                warn!(
                    %event_id,
                    transaction_id = %transaction.id,
                    attempt = delivery.attempt,
                    retry_in_ms = retry_in.as_millis() as u64,
                    error = %err,
                    "failed to settle transaction; will retry"
                );
                subscription.nack(&delivery, retry_in).await
            }
        }
    }

    /// Sleeps unless shutdown arrives first; returns true on shutdown
    async fn pause(&self, shutdown: &mut watch::Receiver<bool>, delay: Duration) -> bool {
        tokio::select! {
            _ = shutdown.changed() => true,
            _ = tokio::time::sleep(delay) => false,
        }
    }
}

impl std::fmt::Debug for TransactionConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionConsumer")
            .field("config", &self.config)
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

/// Handle to control and join a running consumer
#[derive(Debug)]
pub struct ConsumerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl ConsumerHandle {
    pub fn stats(&self) -> ConsumerStats {
        self.counters.snapshot()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Requests graceful shutdown and waits for the consumer to stop
    pub async fn shutdown(self) -> ConsumerStats {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.join.await {
            error!(error = %err, "settlement consumer task failed");
        }
        self.counters.snapshot()
    }
}
