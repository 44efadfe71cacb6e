//! Shared wiring for the ledger integration tests

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use core_kernel::{Amount, CarrierId, FixedClock, Timezone};
use domain_ledger::events::{ConsumerConfig, InMemoryEventQueue, TransactionConsumer, TransactionEmitter};
use domain_ledger::ports::mock::{MockAccountPort, MockTransactionHistory};
use domain_ledger::{
    Account, AccountLocks, DailyLimitCalculator, DepositCommand, StatementQuery, TransferCommand,
    UpdateStatusCommand, WithdrawalCommand, WithdrawalLimits,
};

pub const AGENCY: u64 = 878;

/// 12:00 in Sao Paulo on 1 May 2024
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap()
}

pub fn sao_paulo() -> Timezone {
    "America/Sao_Paulo".parse().unwrap()
}

pub fn account(account_number: u64, cents: u64) -> Account {
    Account::open(CarrierId::new(), "12345678909", AGENCY, account_number)
        .with_balance(Amount::from_cents(cents))
}

pub fn cents(value: u64) -> Amount {
    Amount::from_cents(value)
}

/// In-memory adapters plus the commands built over them
pub struct Harness {
    pub accounts: Arc<MockAccountPort>,
    pub history: Arc<MockTransactionHistory>,
    pub queue: Arc<InMemoryEventQueue>,
    pub locks: Arc<AccountLocks>,
    pub clock: Arc<FixedClock>,
    pub timezone: Timezone,
}

impl Harness {
    pub async fn new(accounts: Vec<Account>) -> Self {
        Self::with_history(accounts, MockTransactionHistory::new()).await
    }

    pub async fn with_history(accounts: Vec<Account>, history: MockTransactionHistory) -> Self {
        Self {
            accounts: Arc::new(MockAccountPort::with_accounts(accounts).await),
            history: Arc::new(history),
            queue: Arc::new(InMemoryEventQueue::new()),
            locks: Arc::new(AccountLocks::new()),
            clock: Arc::new(FixedClock::at(now())),
            timezone: sao_paulo(),
        }
    }

    pub fn emitter(&self) -> TransactionEmitter {
        TransactionEmitter::new(self.queue.clone())
    }

    pub fn calculator(&self) -> DailyLimitCalculator {
        DailyLimitCalculator::new(self.history.clone(), self.clock.clone(), self.timezone)
    }

    pub fn withdrawal(&self) -> WithdrawalCommand {
        self.withdrawal_with(WithdrawalLimits::default())
    }

    pub fn withdrawal_with(&self, limits: WithdrawalLimits) -> WithdrawalCommand {
        WithdrawalCommand::new(
            self.accounts.clone(),
            self.calculator(),
            limits,
            self.emitter(),
            self.locks.clone(),
            self.clock.clone(),
        )
    }

    pub fn deposit(&self) -> DepositCommand {
        DepositCommand::new(self.accounts.clone(), self.emitter(), self.locks.clone(), self.clock.clone())
    }

    pub fn transfer(&self) -> TransferCommand {
        TransferCommand::new(self.accounts.clone(), self.emitter(), self.locks.clone(), self.clock.clone())
    }

    pub fn update_status(&self) -> UpdateStatusCommand {
        UpdateStatusCommand::new(self.accounts.clone(), self.locks.clone())
    }

    pub fn statement(&self) -> StatementQuery {
        StatementQuery::new(self.accounts.clone(), self.history.clone(), self.timezone)
    }

    pub fn consumer(&self) -> TransactionConsumer {
        TransactionConsumer::new(self.queue.clone(), self.history.clone(), fast_retries())
    }
}

pub fn fast_retries() -> ConsumerConfig {
    ConsumerConfig {
        retry_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(10),
    }
}

/// Polls `check` until it holds, failing the test after five seconds
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached within five seconds");
}
