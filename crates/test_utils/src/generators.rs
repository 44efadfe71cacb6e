//! Property-Based Test Generators
//!
//! Provides proptest strategies for generating random test data
//! that maintains domain invariants.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use core_kernel::{Amount, CarrierId};
use domain_ledger::{Account, AccountStatus};

use crate::fixtures::FIXTURE_AGENCY;

/// Strategy for amounts up to one million units
pub fn amount_strategy() -> impl Strategy<Value = Amount> {
    (0u64..=100_000_000u64).prop_map(Amount::from_cents)
}

/// Strategy for strictly positive amounts
pub fn positive_amount_strategy() -> impl Strategy<Value = Amount> {
    (1u64..=100_000_000u64).prop_map(Amount::from_cents)
}

/// Strategy for account numbers
pub fn account_number_strategy() -> impl Strategy<Value = u64> {
    1u64..100_000u64
}

/// Strategy for any account status
pub fn account_status_strategy() -> impl Strategy<Value = AccountStatus> {
    prop_oneof![
        Just(AccountStatus::Active),
        Just(AccountStatus::Blocked),
        Just(AccountStatus::Closed),
    ]
}

/// Strategy for active accounts at the fixture agency
pub fn active_account_strategy() -> impl Strategy<Value = Account> {
    (account_number_strategy(), amount_strategy()).prop_map(|(number, balance)| {
        Account::open(CarrierId::new(), "12345678909", FIXTURE_AGENCY, number).with_balance(balance)
    })
}

/// Strategy for a sequence of withdrawal requests in cents
pub fn withdrawal_sequence_strategy(max_len: usize) -> impl Strategy<Value = Vec<Amount>> {
    prop::collection::vec((1u64..=50_000u64).prop_map(Amount::from_cents), 1..=max_len)
}

/// Strategy for instants within 2024
pub fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    (0i64..366 * 24 * 60 * 60).prop_map(move |secs| start + Duration::seconds(secs))
}
