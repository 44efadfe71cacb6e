//! Test Data Builders
//!
//! Provides builder patterns for constructing test data with sensible defaults.
//! These builders allow tests to specify only the relevant fields while using
//! defaults for everything else.

use chrono::{DateTime, Utc};

use core_kernel::{AccountId, Amount, CarrierId, TransactionId};
use domain_ledger::{Account, AccountStatus, Transaction, TransactionKind};

use crate::fixtures::{FIXTURE_AGENCY, FIXTURE_CPF, TemporalFixtures};

/// Builder for constructing test accounts
pub struct TestAccountBuilder {
    carrier_id: CarrierId,
    cpf: String,
    agency: u64,
    account_number: u64,
    balance: Amount,
    status: AccountStatus,
    daily_withdrawal_limit: Option<Amount>,
}

impl Default for TestAccountBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestAccountBuilder {
    /// Creates a new builder for an empty active account 1 at the fixture agency
    pub fn new() -> Self {
        Self {
            carrier_id: CarrierId::new(),
            cpf: FIXTURE_CPF.to_string(),
            agency: FIXTURE_AGENCY,
            account_number: 1,
            balance: Amount::zero(),
            status: AccountStatus::Active,
            daily_withdrawal_limit: None,
        }
    }

    pub fn with_carrier(mut self, carrier_id: CarrierId) -> Self {
        self.carrier_id = carrier_id;
        self
    }

    pub fn with_cpf(mut self, cpf: impl Into<String>) -> Self {
        self.cpf = cpf.into();
        self
    }

    pub fn with_agency(mut self, agency: u64) -> Self {
        self.agency = agency;
        self
    }

    pub fn with_number(mut self, account_number: u64) -> Self {
        self.account_number = account_number;
        self
    }

    pub fn with_balance_cents(mut self, cents: u64) -> Self {
        self.balance = Amount::from_cents(cents);
        self
    }

    pub fn with_status(mut self, status: AccountStatus) -> Self {
        self.status = status;
        self
    }

    /// Overrides the configured daily ceiling for this account
    pub fn with_daily_limit_cents(mut self, cents: u64) -> Self {
        self.daily_withdrawal_limit = Some(Amount::from_cents(cents));
        self
    }

    pub fn build(self) -> Account {
        let mut account = Account::open(self.carrier_id, self.cpf, self.agency, self.account_number)
            .with_balance(self.balance);
        account.status = self.status;
        account.daily_withdrawal_limit = self.daily_withdrawal_limit;
        account
    }
}

/// Builder for seeding transaction history
pub struct TestTransactionBuilder {
    kind: TransactionKind,
    amount: Amount,
    source: Option<AccountId>,
    destination: Option<AccountId>,
    occurred_at: DateTime<Utc>,
}

impl TestTransactionBuilder {
    /// A withdrawal from `source` at the fixture business noon
    pub fn withdrawal(source: AccountId, cents: u64) -> Self {
        Self {
            kind: TransactionKind::Withdrawal,
            amount: Amount::from_cents(cents),
            source: Some(source),
            destination: None,
            occurred_at: TemporalFixtures::business_noon(),
        }
    }

    /// A deposit into `destination` at the fixture business noon
    pub fn deposit(destination: AccountId, cents: u64) -> Self {
        Self {
            kind: TransactionKind::Deposit,
            amount: Amount::from_cents(cents),
            source: None,
            destination: Some(destination),
            occurred_at: TemporalFixtures::business_noon(),
        }
    }

    /// A transfer between two accounts at the fixture business noon
    pub fn transfer(source: AccountId, destination: AccountId, cents: u64) -> Self {
        Self {
            kind: TransactionKind::Transfer,
            amount: Amount::from_cents(cents),
            source: Some(source),
            destination: Some(destination),
            occurred_at: TemporalFixtures::business_noon(),
        }
    }

    pub fn at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    pub fn build(self) -> Transaction {
        Transaction {
            id: TransactionId::new_v7(),
            kind: self.kind,
            amount: self.amount,
            source: self.source,
            destination: self.destination,
            occurred_at: self.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_builder_defaults() {
        let account = TestAccountBuilder::new().build();
        assert_eq!(account.agency, FIXTURE_AGENCY);
        assert_eq!(account.account_number, 1);
        assert!(account.balance.is_zero());
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.daily_withdrawal_limit, None);
    }

    #[test]
    fn test_account_builder_overrides() {
        let account = TestAccountBuilder::new()
            .with_number(42)
            .with_balance_cents(1_000)
            .with_status(AccountStatus::Blocked)
            .with_daily_limit_cents(500)
            .build();

        assert_eq!(account.account_number, 42);
        assert_eq!(account.balance, Amount::from_cents(1_000));
        assert_eq!(account.status, AccountStatus::Blocked);
        assert_eq!(account.daily_withdrawal_limit, Some(Amount::from_cents(500)));
    }

    #[test]
    fn test_transaction_builder_shapes() {
        let a = AccountId::new();
        let b = AccountId::new();

        let withdrawal = TestTransactionBuilder::withdrawal(a, 100).build();
        assert_eq!((withdrawal.source, withdrawal.destination), (Some(a), None));

        let deposit = TestTransactionBuilder::deposit(b, 100).build();
        assert_eq!((deposit.source, deposit.destination), (None, Some(b)));

        let transfer = TestTransactionBuilder::transfer(a, b, 100)
            .at(TemporalFixtures::previous_evening())
            .build();
        assert_eq!(transfer.kind, TransactionKind::Transfer);
        assert_eq!(transfer.occurred_at, TemporalFixtures::previous_evening());
    }
}
