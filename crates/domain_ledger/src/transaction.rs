//! Transaction records
//!
//! A transaction is the immutable record of one committed balance mutation.
//! Which account fields are set depends on the kind:
//! - Deposit: destination only
//! - Withdrawal: source only
//! - Transfer: both

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{AccountId, Amount, TransactionId};

/// Kind of balance mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a transaction relative to one account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryDirection {
    /// Money entered the account
    Credit,
    /// Money left the account
    Debit,
}

/// Immutable record of a committed balance mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub kind: TransactionKind,
    pub amount: Amount,
    pub source: Option<AccountId>,
    pub destination: Option<AccountId>,
    pub occurred_at: DateTime<Utc>,
}

impl Transaction {
    /// Records money entering `destination`
    pub fn deposit(destination: AccountId, amount: Amount, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::new_v7(),
            kind: TransactionKind::Deposit,
            amount,
            source: None,
            destination: Some(destination),
            occurred_at,
        }
    }

    /// Records money leaving `source`
    pub fn withdrawal(source: AccountId, amount: Amount, occurred_at: DateTime<Utc>) -> Self {
        Self {
            id: TransactionId::new_v7(),
            kind: TransactionKind::Withdrawal,
            amount,
            source: Some(source),
            destination: None,
            occurred_at,
        }
    }

    /// Records money moving from `source` to `destination`
    pub fn transfer(
        source: AccountId,
        destination: AccountId,
        amount: Amount,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new_v7(),
            kind: TransactionKind::Transfer,
            amount,
            source: Some(source),
            destination: Some(destination),
            occurred_at,
        }
    }

    /// Returns true if the account is the source or the destination
    pub fn touches(&self, account: AccountId) -> bool {
        self.source == Some(account) || self.destination == Some(account)
    }

    /// Returns the direction of this transaction for the given account
    pub fn direction_for(&self, account: AccountId) -> Option<EntryDirection> {
        if self.destination == Some(account) {
            Some(EntryDirection::Credit)
        } else if self.source == Some(account) {
            Some(EntryDirection::Debit)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_directions() {
        let from = AccountId::new();
        let to = AccountId::new();
        let other = AccountId::new();
        let tx = Transaction::transfer(from, to, Amount::from_cents(50), Utc::now());

        assert_eq!(tx.direction_for(from), Some(EntryDirection::Debit));
        assert_eq!(tx.direction_for(to), Some(EntryDirection::Credit));
        assert_eq!(tx.direction_for(other), None);
        assert!(!tx.touches(other));
    }

    #[test]
    fn test_kind_serializes_snake_case() {
        let json = serde_json::to_string(&TransactionKind::Withdrawal).unwrap();
        assert_eq!(json, "\"withdrawal\"");
    }

    #[test]
    fn test_withdrawal_has_no_destination() {
        let source = AccountId::new();
        let tx = Transaction::withdrawal(source, Amount::from_cents(200), Utc::now());
        assert_eq!(tx.source, Some(source));
        assert!(tx.destination.is_none());
        assert_eq!(tx.kind, TransactionKind::Withdrawal);
    }
}
