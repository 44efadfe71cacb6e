//! Custom Test Assertions
//!
//! Provides specialized assertion helpers for ledger types that give
//! more meaningful error messages than standard assertions.

use rust_decimal::Decimal;

use core_kernel::Amount;
use domain_ledger::{Account, LedgerError, Transaction, TransactionKind};

/// Asserts an account balance in cents
pub fn assert_balance(account: &Account, expected_cents: u64) {
    assert_eq!(
        account.balance.cents(),
        expected_cents,
        "Balance mismatch for account {}: actual={}, expected={}",
        account.key(),
        account.balance,
        Amount::from_cents(expected_cents)
    );
}

/// Asserts an amount expressed in major units, e.g. `dec!(123.45)`
pub fn assert_amount_decimal(amount: Amount, expected: Decimal) {
    assert_eq!(
        amount.to_decimal(),
        expected,
        "Amount mismatch: actual={}, expected={}",
        amount,
        expected
    );
}

/// Asserts that the sum of balances did not change
pub fn assert_conserved(before: &[Account], after: &[Account]) {
    let total = |accounts: &[Account]| -> u128 {
        accounts.iter().map(|a| u128::from(a.balance.cents())).sum()
    };

    assert_eq!(
        total(before),
        total(after),
        "Balances not conserved: before={}, after={}",
        total(before),
        total(after)
    );
}

/// Asserts that a transaction has the given kind and amount
pub fn assert_transaction(transaction: &Transaction, kind: TransactionKind, cents: u64) {
    assert_eq!(transaction.kind, kind, "Unexpected kind for {}", transaction.id);
    assert_eq!(
        transaction.amount.cents(),
        cents,
        "Unexpected amount for {}",
        transaction.id
    );
}

/// Asserts the outcome is a business rejection rather than an infrastructure failure
pub fn assert_business_rejection<T: std::fmt::Debug>(result: &Result<T, LedgerError>) {
    match result {
        Err(err) => assert!(
            err.is_business_rejection(),
            "Expected a business rejection, got infrastructure error: {}",
            err
        ),
        Ok(value) => panic!("Expected a business rejection, got Ok({:?})", value),
    }
}
