//! Ledger domain errors

use chrono::NaiveDate;
use thiserror::Error;

use core_kernel::{AccountId, Amount, PortError, TemporalError};

use crate::account::AccountStatus;

/// Errors returned by ledger commands
///
/// Every failed command returns exactly one of these. Publishing problems
/// are reported separately through `PublishError` and never fail a command.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No account matches the natural key
    #[error("Account not found: number {account_number} at agency {agency}")]
    AccountNotFound {
        account_number: u64,
        agency: u64,
    },

    /// The requested amount exceeds the balance
    #[error("Insufficient balance: balance={balance}, requested={requested}")]
    InsufficientBalance {
        balance: Amount,
        requested: Amount,
    },

    /// The withdrawal would take the day's total past the ceiling
    #[error("Daily withdrawal limit exceeded: withdrawn today={withdrawn_today}, requested={requested}, ceiling={ceiling}")]
    DailyWithdrawalLimitExceeded {
        withdrawn_today: Amount,
        requested: Amount,
        ceiling: Amount,
    },

    /// The account status does not accept transactions
    #[error("Account {account_id} is {status}")]
    AccountNotActive {
        account_id: AccountId,
        status: AccountStatus,
    },

    /// Amounts must be greater than zero
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    /// A credit would overflow the balance
    #[error("Balance overflow")]
    BalanceOverflow,

    /// Source and destination are the same account
    #[error("Cannot transfer to the same account")]
    SameAccountTransfer,

    /// The status change is not allowed
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: AccountStatus,
        to: AccountStatus,
    },

    /// Statement period is reversed
    #[error("Invalid period: {from} is after {to}")]
    InvalidPeriod {
        from: NaiveDate,
        to: NaiveDate,
    },

    /// Business-day computation failed in the configured timezone
    #[error("Calendar error: {0}")]
    Calendar(#[from] TemporalError),

    /// The underlying store failed
    #[error("Storage error: {0}")]
    Storage(#[from] PortError),
}

impl LedgerError {
    /// Returns true for rejections decided by ledger rules rather than infrastructure
    pub fn is_business_rejection(&self) -> bool {
        !matches!(self, LedgerError::Storage(_) | LedgerError::Calendar(_))
    }
}

/// Result alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;
