//! Per-account serialization
//!
//! Commands hold the lock of every account they touch for the whole
//! read, validate, write sequence. Two same-account commands therefore never
//! interleave inside one process. Across processes the store's version check
//! rejects the loser.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::account::AccountKey;

/// Idle entries are pruned once the table grows past this size
const PRUNE_THRESHOLD: usize = 1024;

/// Guard held while a command works on an account
pub type AccountGuard = OwnedMutexGuard<()>;

/// Table of keyed async mutexes
#[derive(Debug, Default)]
pub struct AccountLocks {
    table: Mutex<HashMap<AccountKey, Arc<AsyncMutex<()>>>>,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, key: AccountKey) -> Arc<AsyncMutex<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);

        if table.len() > PRUNE_THRESHOLD {
            table.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        Arc::clone(table.entry(key).or_default())
    }

    /// Waits for exclusive access to one account
    pub async fn lock(&self, key: AccountKey) -> AccountGuard {
        self.entry(key).lock_owned().await
    }

    /// Waits for exclusive access to two distinct accounts
    ///
    /// Locks are taken in ascending key order whatever the argument order,
    /// so two opposite transfers cannot deadlock. The guards are returned
    /// in argument order.
    pub async fn lock_pair(&self, a: AccountKey, b: AccountKey) -> (AccountGuard, AccountGuard) {
        if a <= b {
            let first = self.lock(a).await;
            let second = self.lock(b).await;
            (first, second)
        } else {
            let second = self.lock(b).await;
            let first = self.lock(a).await;
            (first, second)
        }
    }

    /// Number of tracked keys
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
