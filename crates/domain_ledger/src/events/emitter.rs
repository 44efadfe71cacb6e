//! Fire-and-forget publishing of transaction events

use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use core_kernel::{EventId, TransactionId};

use super::{PublishError, TransactionEvent};
use crate::ports::EventProvider;
use crate::transaction::Transaction;

/// Handle on the outcome of one publish
///
/// Dropping the receipt does not cancel the publish.
#[derive(Debug)]
pub struct PublishReceipt {
    transaction_id: TransactionId,
    event_id: Option<EventId>,
    outcome: oneshot::Receiver<Result<(), PublishError>>,
}

impl PublishReceipt {
    fn resolved(transaction_id: TransactionId, result: Result<(), PublishError>) -> Self {
        let (sender, outcome) = oneshot::channel();
        let _ = sender.send(result);
        Self {
            transaction_id,
            event_id: None,
            outcome,
        }
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Id of the event, if one was built
    pub fn event_id(&self) -> Option<EventId> {
        self.event_id
    }

    /// Waits for the publish to finish
    pub async fn outcome(self) -> Result<(), PublishError> {
        self.outcome.await.unwrap_or(Err(PublishError::Abandoned))
    }
}

/// Publishes transaction events on a background task
#[derive(Clone)]
pub struct TransactionEmitter {
    provider: Arc<dyn EventProvider>,
}

impl TransactionEmitter {
    pub fn new(provider: Arc<dyn EventProvider>) -> Self {
        Self { provider }
    }

    /// Starts publishing an event for the transaction and returns immediately
    ///
    /// The event is stamped with the transaction's `occurred_at`, so it
    /// follows whatever clock the command ran under.
    ///
    /// Failures are logged here and reported through the receipt. The
    /// balance mutation that produced the transaction is never undone.
    pub fn emit(&self, transaction: &Transaction) -> PublishReceipt {
        let event = match TransactionEvent::from_transaction(transaction, transaction.occurred_at) {
            Ok(event) => event,
            Err(err) => {
                warn!(transaction_id = %transaction.id, error = %err, "failed to encode transaction event");
                return PublishReceipt::resolved(transaction.id, Err(err));
            }
        };

        let event_id = event.event_id;
        let transaction_id = transaction.id;
        let provider = Arc::clone(&self.provider);
        let (sender, outcome) = oneshot::channel();

        tokio::spawn(async move {
            let result = provider.publish(event).await;
            match &result {
                Ok(()) => debug!(%transaction_id, %event_id, "transaction event published"),
                Err(err) => warn!(
                    %transaction_id,
                    %event_id,
                    error = %err,
                    "failed to publish transaction event; history will not settle until it is re-emitted"
                ),
            }
            let _ = sender.send(result);
        });

        PublishReceipt {
            transaction_id,
            event_id: Some(event_id),
            outcome,
        }
    }
}

impl std::fmt::Debug for TransactionEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionEmitter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::InMemoryEventQueue;
    use crate::ports::EventSubscription;
    use chrono::{TimeZone, Utc};
    use core_kernel::{AccountId, Amount};

    #[tokio::test]
    async fn test_emit_reaches_queue() {
        let queue = Arc::new(InMemoryEventQueue::new());
        let emitter = TransactionEmitter::new(queue.clone());
        let tx = Transaction::deposit(AccountId::new(), Amount::from_cents(10), Utc::now());

        let receipt = emitter.emit(&tx);
        let event_id = receipt.event_id().unwrap();
        receipt.outcome().await.unwrap();

        assert_eq!(queue.pending(), 1);
        assert!(queue.state_of(event_id).is_some());
    }

    #[tokio::test]
    async fn test_emitted_at_follows_transaction_time() {
        let queue = Arc::new(InMemoryEventQueue::new());
        let emitter = TransactionEmitter::new(queue.clone());
        let occurred_at = Utc.with_ymd_and_hms(2024, 3, 4, 15, 0, 0).unwrap();
        let tx = Transaction::withdrawal(AccountId::new(), Amount::from_cents(10), occurred_at);

        emitter.emit(&tx).outcome().await.unwrap();

        let mut sub = queue.subscribe().await.unwrap();
        let delivery = sub.next().await.unwrap().unwrap();
        assert_eq!(delivery.event.emitted_at, occurred_at);
    }

    #[tokio::test]
    async fn test_emit_reports_rejection() {
        let queue = Arc::new(InMemoryEventQueue::new());
        queue.fail_publishes(true);
        let emitter = TransactionEmitter::new(queue.clone());
        let tx = Transaction::deposit(AccountId::new(), Amount::from_cents(10), Utc::now());

        let result = emitter.emit(&tx).outcome().await;

        assert!(matches!(result, Err(PublishError::Rejected { .. })));
        assert!(queue.is_empty());
    }
}
