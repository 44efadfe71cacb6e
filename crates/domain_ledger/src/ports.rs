//! Ledger Domain Ports
//!
//! This module defines the port interfaces the ledger commands and the
//! settlement consumer depend on. Adapters live elsewhere:
//!
//! - **Postgres Adapters**: `infra_db` repositories and the durable queue
//! - **In-memory Adapters**: the `mock` module below and `InMemoryEventQueue`
//!
//! # Usage
//!
//! ```rust,ignore
//! use domain_ledger::ports::AccountPort;
//! use std::sync::Arc;
//!
//! pub struct BalanceLookup {
//!     accounts: Arc<dyn AccountPort>,
//! }
//!
//! impl BalanceLookup {
//!     pub async fn balance(&self, number: u64, agency: u64) -> Result<Amount, PortError> {
//!         Ok(self.accounts.find_by_number_and_agency(number, agency).await?.balance)
//!     }
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use core_kernel::{AccountId, Amount, DomainPort, HealthCheckable, PortError};

use crate::account::Account;
use crate::events::{Delivery, PublishError, TransactionEvent};
use crate::transaction::Transaction;

/// Port for reading and writing account balances
#[async_trait]
pub trait AccountPort: DomainPort + HealthCheckable {
    /// Finds an account by its natural key
    ///
    /// # Errors
    ///
    /// Returns `PortError::NotFound` if no account matches
    async fn find_by_number_and_agency(
        &self,
        account_number: u64,
        agency: u64,
    ) -> Result<Account, PortError>;

    /// Persists the balance and status of one account
    ///
    /// The write only applies if the stored version still equals
    /// `account.version`. Returns the stored account with the bumped version.
    ///
    /// # Errors
    ///
    /// Returns `PortError::Conflict` if the stored version has moved on
    async fn update(&self, account: &Account) -> Result<Account, PortError>;

    /// Persists the balances of two accounts atomically
    ///
    /// Both rows are committed or neither is. Each row is version-checked
    /// like `update`.
    async fn update_balance_transaction(
        &self,
        first: &Account,
        second: &Account,
    ) -> Result<(Account, Account), PortError>;
}

/// Result of appending a transaction to the history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The row was written
    Inserted,
    /// A row with the same transaction id already existed
    Duplicate,
}

/// Port for the append-only transaction history
#[async_trait]
pub trait TransactionHistoryPort: DomainPort {
    /// Appends a transaction, idempotent on its id
    async fn append(&self, transaction: &Transaction) -> Result<AppendOutcome, PortError>;

    /// Sums withdrawals from `account` with `from <= occurred_at < to`
    async fn withdrawn_between(
        &self,
        account: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Amount, PortError>;

    /// Lists transactions touching `account` in `[from, to)`, oldest first
    async fn list_between(
        &self,
        account: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, PortError>;
}

/// Port for the queue that carries transaction events to settlement
#[async_trait]
pub trait EventProvider: DomainPort {
    /// Enqueues an event
    async fn publish(&self, event: TransactionEvent) -> Result<(), PublishError>;

    /// Opens a subscription that receives every unsettled event
    async fn subscribe(&self) -> Result<Box<dyn EventSubscription>, PortError>;
}

/// A consumer's view of the queue
///
/// Delivery is at-least-once. Events delivered on a subscription that is
/// dropped before acknowledging them become deliverable again.
#[async_trait]
pub trait EventSubscription: Send {
    /// Waits for the next deliverable event
    ///
    /// Returns `Ok(None)` once the queue is closed.
    async fn next(&mut self) -> Result<Option<Delivery>, PortError>;

    /// Marks the event settled; it is never delivered again
    async fn ack(&mut self, delivery: &Delivery) -> Result<(), PortError>;

    /// Returns the event to the queue, deliverable again after `retry_in`
    async fn nack(&mut self, delivery: &Delivery, retry_in: Duration) -> Result<(), PortError>;
}

/// In-memory implementations of the store ports
///
/// Both adapters keep their data in `tokio::sync::RwLock` maps and expose
/// fault injection switches so tests can observe rollback and redelivery.
#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    use core_kernel::HealthCheckResult;

    /// In-memory mock implementation of AccountPort
    #[derive(Debug, Default)]
    pub struct MockAccountPort {
        accounts: Arc<RwLock<HashMap<AccountId, Account>>>,
        fail_next_update: AtomicBool,
        fail_after_first_write: AtomicBool,
    }

    impl MockAccountPort {
        /// Creates an empty mock port
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with accounts for testing
        pub async fn with_accounts(accounts: Vec<Account>) -> Self {
            let port = Self::new();
            for account in accounts {
                port.insert(account).await;
            }
            port
        }

        /// Inserts or replaces an account as-is
        pub async fn insert(&self, account: Account) {
            self.accounts.write().await.insert(account.id, account);
        }

        /// Returns the stored copy of an account
        pub async fn get(&self, id: AccountId) -> Option<Account> {
            self.accounts.read().await.get(&id).cloned()
        }

        /// Sum of every stored balance
        pub async fn total_balance(&self) -> Amount {
            self.accounts.read().await.values().map(|a| a.balance).sum()
        }

        /// Makes the next `update` call fail with a connection error
        pub fn fail_next_update(&self) {
            self.fail_next_update.store(true, Ordering::SeqCst);
        }

        /// Makes the next two-row update fail after staging its first write
        pub fn fail_transaction_after_first_write(&self) {
            self.fail_after_first_write.store(true, Ordering::SeqCst);
        }

        fn check_version(stored: &Account, incoming: &Account) -> Result<(), PortError> {
            if stored.version != incoming.version {
                return Err(PortError::conflict(format!(
                    "account {} changed: expected version {}, found {}",
                    incoming.id, incoming.version, stored.version
                )));
            }
            Ok(())
        }

        fn apply(stored: &Account, incoming: &Account) -> Account {
            Account {
                balance: incoming.balance,
                status: incoming.status,
                daily_withdrawal_limit: incoming.daily_withdrawal_limit,
                version: stored.version + 1,
                ..stored.clone()
            }
        }
    }

    impl DomainPort for MockAccountPort {}

    #[async_trait]
    impl HealthCheckable for MockAccountPort {
        async fn health_check(&self) -> HealthCheckResult {
            let mut result = HealthCheckResult::healthy("mock-account-port", 0);
            result.message = Some("Mock adapter always healthy".to_string());
            result
        }
    }

    #[async_trait]
    impl AccountPort for MockAccountPort {
        async fn find_by_number_and_agency(
            &self,
            account_number: u64,
            agency: u64,
        ) -> Result<Account, PortError> {
            self.accounts
                .read()
                .await
                .values()
                .find(|a| a.account_number == account_number && a.agency == agency)
                .cloned()
                .ok_or_else(|| PortError::not_found("Account", format!("{}/{}", agency, account_number)))
        }

        async fn update(&self, account: &Account) -> Result<Account, PortError> {
            if self.fail_next_update.swap(false, Ordering::SeqCst) {
                return Err(PortError::connection("injected update failure"));
            }

            let mut accounts = self.accounts.write().await;
            let stored = accounts
                .get(&account.id)
                .ok_or_else(|| PortError::not_found("Account", account.id))?;
            Self::check_version(stored, account)?;

            let updated = Self::apply(stored, account);
            accounts.insert(updated.id, updated.clone());
            Ok(updated)
        }

        async fn update_balance_transaction(
            &self,
            first: &Account,
            second: &Account,
        ) -> Result<(Account, Account), PortError> {
            let mut accounts = self.accounts.write().await;

            // Writes are staged and only become visible once both succeed
            let mut staged = Vec::with_capacity(2);
            for incoming in [first, second] {
                let stored = accounts
                    .get(&incoming.id)
                    .ok_or_else(|| PortError::not_found("Account", incoming.id))?;
                Self::check_version(stored, incoming)?;
                staged.push(Self::apply(stored, incoming));

                if self.fail_after_first_write.swap(false, Ordering::SeqCst) {
                    return Err(PortError::connection("injected failure after first write"));
                }
            }

            for account in &staged {
                accounts.insert(account.id, account.clone());
            }
            let second = staged.pop().ok_or_else(|| PortError::internal("missing staged write"))?;
            let first = staged.pop().ok_or_else(|| PortError::internal("missing staged write"))?;
            Ok((first, second))
        }
    }

    /// In-memory mock implementation of TransactionHistoryPort
    #[derive(Debug, Default)]
    pub struct MockTransactionHistory {
        rows: Arc<RwLock<Vec<Transaction>>>,
        failing_appends: AtomicU32,
    }

    impl MockTransactionHistory {
        /// Creates an empty history
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with settled transactions
        pub async fn with_transactions(transactions: Vec<Transaction>) -> Self {
            let history = Self::new();
            history.rows.write().await.extend(transactions);
            history
        }

        /// Every stored row, in append order
        pub async fn all(&self) -> Vec<Transaction> {
            self.rows.read().await.clone()
        }

        /// Number of stored rows
        pub async fn len(&self) -> usize {
            self.rows.read().await.len()
        }

        /// Makes the next `count` appends fail with a connection error
        pub fn fail_next_append(&self, count: u32) {
            self.failing_appends.store(count, Ordering::SeqCst);
        }
    }

    impl DomainPort for MockTransactionHistory {}

    #[async_trait]
    impl TransactionHistoryPort for MockTransactionHistory {
        async fn append(&self, transaction: &Transaction) -> Result<AppendOutcome, PortError> {
            let injected = self
                .failing_appends
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if injected {
                return Err(PortError::connection("injected append failure"));
            }

            let mut rows = self.rows.write().await;
            if rows.iter().any(|row| row.id == transaction.id) {
                return Ok(AppendOutcome::Duplicate);
            }
            rows.push(transaction.clone());
            Ok(AppendOutcome::Inserted)
        }

        async fn withdrawn_between(
            &self,
            account: AccountId,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Amount, PortError> {
            Ok(self
                .rows
                .read()
                .await
                .iter()
                .filter(|row| row.kind == crate::TransactionKind::Withdrawal)
                .filter(|row| row.source == Some(account))
                .filter(|row| row.occurred_at >= from && row.occurred_at < to)
                .map(|row| row.amount)
                .sum())
        }

        async fn list_between(
            &self,
            account: AccountId,
            from: DateTime<Utc>,
            to: DateTime<Utc>,
        ) -> Result<Vec<Transaction>, PortError> {
            let mut rows: Vec<Transaction> = self
                .rows
                .read()
                .await
                .iter()
                .filter(|row| row.touches(account))
                .filter(|row| row.occurred_at >= from && row.occurred_at < to)
                .cloned()
                .collect();
            rows.sort_by_key(|row| row.occurred_at);
            Ok(rows)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use chrono::TimeZone;
    use core_kernel::CarrierId;

    fn account(number: u64, cents: u64) -> Account {
        Account::open(CarrierId::new(), "12345678909", 878, number).with_balance(Amount::from_cents(cents))
    }

    #[tokio::test]
    async fn test_mock_find_by_natural_key() {
        let acc = account(1, 300);
        let port = MockAccountPort::with_accounts(vec![acc.clone()]).await;

        let found = port.find_by_number_and_agency(1, 878).await.unwrap();
        assert_eq!(found.id, acc.id);

        let missing = port.find_by_number_and_agency(2, 878).await;
        assert!(matches!(missing, Err(PortError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_mock_update_bumps_version() {
        let acc = account(1, 300);
        let port = MockAccountPort::with_accounts(vec![acc.clone()]).await;

        let mut changed = acc.clone();
        changed.balance = Amount::from_cents(100);
        let stored = port.update(&changed).await.unwrap();

        assert_eq!(stored.version, acc.version + 1);
        assert_eq!(stored.balance, Amount::from_cents(100));
    }

    #[tokio::test]
    async fn test_mock_update_rejects_stale_version() {
        let acc = account(1, 300);
        let port = MockAccountPort::with_accounts(vec![acc.clone()]).await;

        port.update(&acc).await.unwrap();
        let stale = port.update(&acc).await;

        assert!(matches!(stale, Err(PortError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_mock_transaction_failure_leaves_both_rows() {
        let a = account(1, 300);
        let b = account(2, 0);
        let port = MockAccountPort::with_accounts(vec![a.clone(), b.clone()]).await;

        let mut a2 = a.clone();
        a2.balance = Amount::from_cents(100);
        let mut b2 = b.clone();
        b2.balance = Amount::from_cents(200);

        port.fail_transaction_after_first_write();
        assert!(port.update_balance_transaction(&a2, &b2).await.is_err());

        assert_eq!(port.get(a.id).await.unwrap(), a);
        assert_eq!(port.get(b.id).await.unwrap(), b);
    }

    #[tokio::test]
    async fn test_mock_history_append_is_idempotent() {
        let history = MockTransactionHistory::new();
        let tx = Transaction::deposit(AccountId::new(), Amount::from_cents(10), Utc::now());

        assert_eq!(history.append(&tx).await.unwrap(), AppendOutcome::Inserted);
        assert_eq!(history.append(&tx).await.unwrap(), AppendOutcome::Duplicate);
        assert_eq!(history.len().await, 1);
    }

    #[tokio::test]
    async fn test_mock_history_withdrawn_window_is_half_open() {
        let account = AccountId::new();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();

        let history = MockTransactionHistory::with_transactions(vec![
            Transaction::withdrawal(account, Amount::from_cents(100), start),
            Transaction::withdrawal(account, Amount::from_cents(200), end),
            Transaction::deposit(account, Amount::from_cents(400), start),
            Transaction::transfer(account, AccountId::new(), Amount::from_cents(800), start),
        ])
        .await;

        let total = history.withdrawn_between(account, start, end).await.unwrap();
        assert_eq!(total, Amount::from_cents(100));
    }

    #[tokio::test]
    async fn test_mock_history_injected_failures_count_down() {
        let history = MockTransactionHistory::new();
        let tx = Transaction::deposit(AccountId::new(), Amount::from_cents(10), Utc::now());

        history.fail_next_append(2);
        assert!(history.append(&tx).await.is_err());
        assert!(history.append(&tx).await.is_err());
        assert_eq!(history.append(&tx).await.unwrap(), AppendOutcome::Inserted);
    }
}
