//! Repository implementations for ledger tables
//!
//! Repositories encapsulate the SQL and map between database rows and
//! domain types. Each repository follows these principles:
//! - Runtime-checked queries bound with typed parameters
//! - Transaction support for multi-row writes
//! - Optimistic concurrency control on account rows

pub mod account;
pub mod transaction;

pub use account::{AccountRepository, AccountRow, AccountStatus};
pub use transaction::{TransactionKind, TransactionRepository, TransactionRow};

use core_kernel::Amount;

use crate::error::DatabaseError;

/// Converts an unsigned domain value to a `BIGINT` parameter
pub(crate) fn to_bigint(field: &'static str, value: u64) -> Result<i64, DatabaseError> {
    i64::try_from(value)
        .map_err(|_| DatabaseError::SerializationError(format!("{field} {value} exceeds BIGINT")))
}

/// Converts a `BIGINT` column back to an unsigned domain value
pub(crate) fn from_bigint(field: &'static str, value: i64) -> Result<u64, DatabaseError> {
    u64::try_from(value)
        .map_err(|_| DatabaseError::SerializationError(format!("{field} {value} is negative")))
}

pub(crate) fn amount_to_bigint(field: &'static str, amount: Amount) -> Result<i64, DatabaseError> {
    to_bigint(field, amount.cents())
}

pub(crate) fn amount_from_bigint(field: &'static str, value: i64) -> Result<Amount, DatabaseError> {
    from_bigint(field, value).map(Amount::from_cents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bigint_bounds() {
        assert_eq!(to_bigint("agency", 878).unwrap(), 878);
        assert!(to_bigint("balance", u64::MAX).is_err());
        assert!(from_bigint("balance", -1).is_err());
        assert_eq!(amount_from_bigint("balance", 300).unwrap(), Amount::from_cents(300));
    }
}
