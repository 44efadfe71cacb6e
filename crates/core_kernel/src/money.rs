//! Monetary amounts in the smallest currency unit
//!
//! Balances and transaction amounts are whole cents held in a `u64`, so a
//! negative amount is unrepresentable. Arithmetic that could leave the valid
//! range is only exposed in checked form.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use thiserror::Error;

/// Number of minor units per major unit
const CENTS_SCALE: u32 = 2;

/// Errors that can occur during amount arithmetic
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Overflow during calculation")]
    Overflow,

    #[error("Result would be negative: {minuend} - {subtrahend}")]
    Underflow {
        minuend: u64,
        subtrahend: u64,
    },

    #[error("Amount out of storable range: {0}")]
    OutOfRange(String),
}

/// A non-negative monetary amount expressed in cents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(u64);

impl Amount {
    /// Creates an amount from a count of cents
    pub const fn from_cents(cents: u64) -> Self {
        Self(cents)
    }

    /// The zero amount
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in cents
    pub const fn cents(&self) -> u64 {
        self.0
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Overflow` if the sum does not fit in a `u64`
    pub fn checked_add(&self, other: Amount) -> Result<Amount, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Amount)
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction
    ///
    /// # Errors
    ///
    /// Returns `MoneyError::Underflow` if `other` is greater than `self`
    pub fn checked_sub(&self, other: Amount) -> Result<Amount, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(Amount)
            .ok_or(MoneyError::Underflow {
                minuend: self.0,
                subtrahend: other.0,
            })
    }

    /// Addition clamped at `u64::MAX`
    pub fn saturating_add(&self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }

    /// Returns the amount in major units (e.g. `12345` cents is `123.45`)
    pub fn to_decimal(&self) -> Decimal {
        Decimal::from_i128_with_scale(i128::from(self.0), CENTS_SCALE)
    }

    /// Converts to the signed representation used by SQL `BIGINT` columns
    pub fn to_i64(&self) -> Result<i64, MoneyError> {
        i64::try_from(self.0).map_err(|_| MoneyError::OutOfRange(self.0.to_string()))
    }
}

impl TryFrom<i64> for Amount {
    type Error = MoneyError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Amount)
            .map_err(|_| MoneyError::OutOfRange(value.to_string()))
    }
}

impl From<u64> for Amount {
    fn from(cents: u64) -> Self {
        Amount(cents)
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount::zero(), |acc, a| acc.saturating_add(a))
    }
}

impl<'a> Sum<&'a Amount> for Amount {
    fn sum<I: Iterator<Item = &'a Amount>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}
