//! Account aggregate
//!
//! An account is identified internally by `AccountId` and externally by the
//! composite natural key (agency, account number). Its balance is an
//! unsigned count of cents, so the balance floor holds by construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AccountId, Amount, CarrierId};

use crate::error::LedgerError;

/// Lifecycle status of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// Account accepts deposits, withdrawals and transfers
    Active,
    /// Account is frozen; it can be reactivated or closed
    Blocked,
    /// Account is permanently closed
    Closed,
}

impl AccountStatus {
    /// Returns true if monetary transactions may touch the account
    pub fn permits_transactions(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }

    /// Returns true if moving from `self` to `target` is allowed
    ///
    /// `Active` and `Blocked` may swap freely and both may close.
    /// `Closed` is terminal. A transition to the current status is rejected.
    pub fn can_transition_to(&self, target: AccountStatus) -> bool {
        use AccountStatus::*;
        matches!(
            (self, target),
            (Active, Blocked) | (Blocked, Active) | (Active, Closed) | (Blocked, Closed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Blocked => "blocked",
            AccountStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Composite natural key of an account
///
/// Ordered by agency, then account number. Lock acquisition across two
/// accounts follows this ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub agency: u64,
    pub account_number: u64,
}

impl AccountKey {
    pub fn new(agency: u64, account_number: u64) -> Self {
        Self { agency, account_number }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.agency, self.account_number)
    }
}

/// A customer account holding a balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier, never reused
    pub id: AccountId,
    /// Owning carrier
    pub carrier_id: CarrierId,
    /// Holder's CPF, stored as given
    pub cpf: String,
    /// Branch number
    pub agency: u64,
    /// Account number within the agency
    pub account_number: u64,
    /// Current balance in cents
    pub balance: Amount,
    /// Lifecycle status
    pub status: AccountStatus,
    /// Per-account ceiling override; `None` means the configured default applies
    pub daily_withdrawal_limit: Option<Amount>,
    /// Optimistic concurrency token, bumped on every write
    pub version: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Largest balance an account can hold, the range of a signed 64-bit column
    pub const MAX_BALANCE: Amount = Amount::from_cents(i64::MAX as u64);

    /// Opens an active account with a zero balance
    ///
    /// # Arguments
    ///
    /// * `carrier_id` - Owning carrier
    /// * `cpf` - Holder's CPF
    /// * `agency` - Branch number
    /// * `account_number` - Account number within the agency
    pub fn open(carrier_id: CarrierId, cpf: impl Into<String>, agency: u64, account_number: u64) -> Self {
        Self {
            id: AccountId::new_v7(),
            carrier_id,
            cpf: cpf.into(),
            agency,
            account_number,
            balance: Amount::zero(),
            status: AccountStatus::Active,
            daily_withdrawal_limit: None,
            version: 0,
            created_at: Utc::now(),
        }
    }

    /// Adds `amount` to the balance
    ///
    /// # Errors
    ///
    /// `BalanceOverflow` if the result would exceed `MAX_BALANCE`
    pub fn credit(&mut self, amount: Amount) -> Result<(), LedgerError> {
        self.balance = self
            .balance
            .checked_add(amount)
            .ok()
            .filter(|balance| *balance <= Self::MAX_BALANCE)
            .ok_or(LedgerError::BalanceOverflow)?;
        Ok(())
    }

    /// Sets the starting balance
    pub fn with_balance(mut self, balance: Amount) -> Self {
        self.balance = balance;
        self
    }

    /// Overrides the daily withdrawal ceiling for this account
    pub fn with_daily_withdrawal_limit(mut self, limit: Amount) -> Self {
        self.daily_withdrawal_limit = Some(limit);
        self
    }

    /// Returns the natural key of the account
    pub fn key(&self) -> AccountKey {
        AccountKey::new(self.agency, self.account_number)
    }

    /// Fails with `AccountNotActive` unless the account accepts transactions
    pub fn ensure_active(&self) -> Result<(), LedgerError> {
        if self.status.permits_transactions() {
            Ok(())
        } else {
            Err(LedgerError::AccountNotActive {
                account_id: self.id,
                status: self.status,
            })
        }
    }

    /// Moves the account to a new status
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidStatusTransition` if the move is not
    /// allowed, or if closing an account that still holds a balance.
    pub fn transition_to(&mut self, target: AccountStatus) -> Result<(), LedgerError> {
        let closing_with_funds = target == AccountStatus::Closed && !self.balance.is_zero();

        if !self.status.can_transition_to(target) || closing_with_funds {
            return Err(LedgerError::InvalidStatusTransition {
                from: self.status,
                to: target,
            });
        }

        self.status = target;
        Ok(())
    }
}
