//! Ledger Domain - Account balances and their transaction history
//!
//! This crate holds the rules for moving money between accounts. Balance
//! mutation is synchronous and authoritative; the historical record of each
//! mutation is settled asynchronously by a consumer fed from an event queue.
//!
//! # Consistency rules
//!
//! - A balance never goes below zero
//! - A transfer conserves the sum of both balances
//! - A withdrawal never exceeds the daily ceiling of the account
//! - Every settled history row matches exactly one committed mutation
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::commands::WithdrawalCommand;
//!
//! let committed = withdrawal.execute(account_number, agency, Amount::from_cents(200)).await?;
//! assert_eq!(committed.value.balance, Amount::from_cents(100));
//!
//! // The balance is already committed; the publish outcome is independent
//! if let Err(err) = committed.publish.outcome().await {
//!     tracing::warn!(error = %err, "settlement event not published");
//! }
//! ```

pub mod account;
pub mod transaction;
pub mod error;
pub mod ports;
pub mod limits;
pub mod locks;
pub mod commands;
pub mod statement;
pub mod events;

pub use account::{Account, AccountKey, AccountStatus};
pub use transaction::{EntryDirection, Transaction, TransactionKind};
pub use error::{LedgerError, LedgerResult};
pub use ports::{AccountPort, AppendOutcome, EventProvider, EventSubscription, TransactionHistoryPort};
pub use limits::{DailyLimitCalculator, WithdrawalLimits, DEFAULT_DAILY_WITHDRAWAL_CEILING};
pub use locks::AccountLocks;
pub use commands::{
    Committed, DepositCommand, TransferCommand, TransferredAccounts, UpdateStatusCommand,
    WithdrawalCommand,
};
pub use statement::{Statement, StatementEntry, StatementQuery};
pub use events::{
    ConsumerConfig, ConsumerHandle, ConsumerStats, Delivery, DeliveryState, InMemoryEventQueue,
    PublishError, PublishReceipt, TransactionConsumer, TransactionEmitter, TransactionEvent,
};
