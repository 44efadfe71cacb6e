//! In-process event queue
//!
//! A compliant `EventProvider` for tests and single-process deployments:
//! - events are delivered in publish order
//! - an event handed to a subscription stays invisible until acked or nacked
//! - dropping a subscription returns its unacknowledged events to the queue
//!
//! Nothing survives a process restart.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;

use core_kernel::{DomainPort, EventId, PortError};

use super::{Delivery, PublishError, TransactionEvent};
use crate::ports::{EventProvider, EventSubscription};

/// Settled event ids remembered for duplicate suppression and inspection
const RECENTLY_SETTLED: usize = 1024;

/// Lifecycle of one event inside the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Waiting to be delivered, or returned for redelivery
    Emitted,
    /// Handed to a subscription, awaiting acknowledgement
    Delivered,
    /// Acknowledged; never delivered again
    Settled,
}

#[derive(Debug)]
struct Entry {
    event: TransactionEvent,
    state: DeliveryState,
    attempts: u32,
    visible_at: Instant,
    holder: Option<u64>,
}

/// Only unsettled events are held. Acked events leave `entries` and `order`
/// and only their id and attempt count stay in the bounded `settled` ring.
#[derive(Debug, Default)]
struct QueueState {
    entries: HashMap<EventId, Entry>,
    order: VecDeque<EventId>,
    settled: VecDeque<(EventId, u32)>,
    closed: bool,
    reject_publishes: bool,
    next_subscriber: u64,
}

impl QueueState {
    fn claim(&mut self, subscriber: u64, now: Instant) -> Option<Delivery> {
        let event_id = self.order.iter().copied().find(|id| {
            self.entries
                .get(id)
                .is_some_and(|e| e.state == DeliveryState::Emitted && e.visible_at <= now)
        })?;
        let entry = self.entries.get_mut(&event_id)?;

        entry.state = DeliveryState::Delivered;
        entry.holder = Some(subscriber);
        entry.attempts += 1;

        Some(Delivery {
            event: entry.event.clone(),
            attempt: entry.attempts,
        })
    }

    /// Time until the earliest delayed event becomes visible
    fn next_wakeup(&self, now: Instant) -> Option<Duration> {
        self.entries
            .values()
            .filter(|e| e.state == DeliveryState::Emitted)
            .map(|e| e.visible_at.saturating_duration_since(now))
            .min()
    }

    fn settled_attempts(&self, event_id: EventId) -> Option<u32> {
        self.settled
            .iter()
            .find(|(id, _)| *id == event_id)
            .map(|&(_, attempts)| attempts)
    }

    fn knows(&self, event_id: EventId) -> bool {
        self.entries.contains_key(&event_id) || self.settled_attempts(event_id).is_some()
    }

    fn held_by(&mut self, event_id: EventId, subscriber: u64) -> Result<&mut Entry, PortError> {
        let entry = self
            .entries
            .get_mut(&event_id)
            .ok_or_else(|| PortError::not_found("TransactionEvent", event_id))?;

        if entry.holder != Some(subscriber) {
            return Err(PortError::conflict(format!(
                "event {} is not held by this subscription",
                event_id
            )));
        }
        Ok(entry)
    }

    fn settle(&mut self, event_id: EventId, subscriber: u64) -> Result<(), PortError> {
        let attempts = self.held_by(event_id, subscriber)?.attempts;
        self.entries.remove(&event_id);
        if let Some(position) = self.order.iter().position(|id| *id == event_id) {
            self.order.remove(position);
        }

        if self.settled.len() == RECENTLY_SETTLED {
            self.settled.pop_front();
        }
        self.settled.push_back((event_id, attempts));
        Ok(())
    }

    fn release_all(&mut self, subscriber: u64, now: Instant) {
        for entry in self.entries.values_mut().filter(|e| e.holder == Some(subscriber)) {
            entry.state = DeliveryState::Emitted;
            entry.holder = None;
            entry.visible_at = now;
        }
    }
}

/// In-memory `EventProvider` with at-least-once delivery
#[derive(Debug, Default)]
pub struct InMemoryEventQueue {
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

fn lock(state: &Mutex<QueueState>) -> MutexGuard<'_, QueueState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryEventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of an event
    ///
    /// `None` if it was never published, or if it settled long enough ago to
    /// have left the recently-settled window.
    pub fn state_of(&self, event_id: EventId) -> Option<DeliveryState> {
        let state = lock(&self.state);
        match state.entries.get(&event_id) {
            Some(entry) => Some(entry.state),
            None => state.settled_attempts(event_id).map(|_| DeliveryState::Settled),
        }
    }

    /// Number of delivery attempts made for an event
    pub fn attempts_of(&self, event_id: EventId) -> Option<u32> {
        let state = lock(&self.state);
        match state.entries.get(&event_id) {
            Some(entry) => Some(entry.attempts),
            None => state.settled_attempts(event_id),
        }
    }

    /// Events not yet settled
    pub fn pending(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending() == 0
    }

    /// Makes every publish fail with `PublishError::Rejected` while set
    pub fn fail_publishes(&self, reject: bool) {
        lock(&self.state).reject_publishes = reject;
    }

    /// Stops accepting events and ends every subscription
    pub fn close(&self) {
        lock(&self.state).closed = true;
        self.notify.notify_waiters();
    }
}

impl DomainPort for InMemoryEventQueue {}

#[async_trait]
impl EventProvider for InMemoryEventQueue {
    async fn publish(&self, event: TransactionEvent) -> Result<(), PublishError> {
        {
            let mut state = lock(&self.state);
            if state.closed {
                return Err(PublishError::Closed);
            }
            if state.reject_publishes {
                return Err(PublishError::Rejected {
                    reason: "publishing disabled".to_string(),
                });
            }
            if state.knows(event.event_id) {
                return Ok(());
            }

            let event_id = event.event_id;
            state.order.push_back(event_id);
            state.entries.insert(
                event_id,
                Entry {
                    event,
                    state: DeliveryState::Emitted,
                    attempts: 0,
                    visible_at: Instant::now(),
                    holder: None,
                },
            );
        }

        self.notify.notify_waiters();
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn EventSubscription>, PortError> {
        let id = {
            let mut state = lock(&self.state);
            state.next_subscriber += 1;
            state.next_subscriber
        };

        Ok(Box::new(InMemorySubscription {
            id,
            state: Arc::clone(&self.state),
            notify: Arc::clone(&self.notify),
        }))
    }
}

/// Subscription handed out by `InMemoryEventQueue`
#[derive(Debug)]
pub struct InMemorySubscription {
    id: u64,
    state: Arc<Mutex<QueueState>>,
    notify: Arc<Notify>,
}

#[async_trait]
impl EventSubscription for InMemorySubscription {
    async fn next(&mut self) -> Result<Option<Delivery>, PortError> {
        loop {
            // Registered before inspecting the queue so a publish in between is not missed
            let notified = self.notify.notified();

            let wait = {
                let mut state = lock(&self.state);
                if state.closed {
                    return Ok(None);
                }
                let now = Instant::now();
                if let Some(delivery) = state.claim(self.id, now) {
                    return Ok(Some(delivery));
                }
                state.next_wakeup(now)
            };

            match wait {
                Some(delay) => {
                    tokio::select! {
                        _ = notified => {}
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    async fn ack(&mut self, delivery: &Delivery) -> Result<(), PortError> {
        lock(&self.state).settle(delivery.event.event_id, self.id)
    }

    async fn nack(&mut self, delivery: &Delivery, retry_in: Duration) -> Result<(), PortError> {
        {
            let mut state = lock(&self.state);
            let entry = state.held_by(delivery.event.event_id, self.id)?;
            entry.state = DeliveryState::Emitted;
            entry.holder = None;
            entry.visible_at = Instant::now() + retry_in;
        }
        self.notify.notify_waiters();
        Ok(())
    }
}

impl Drop for InMemorySubscription {
    fn drop(&mut self) {
        lock(&self.state).release_all(self.id, Instant::now());
        self.notify.notify_waiters();
    }
}
