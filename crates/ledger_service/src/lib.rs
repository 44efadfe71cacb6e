//! Ledger Service - process wiring for the account ledger
//!
//! This crate assembles the ledger commands over whichever adapters the
//! caller injects and owns the ambient concerns of a running process:
//! - `LedgerConfig`: `LEDGER_*` environment configuration
//! - `init_tracing`: structured logging
//! - `Ledger`: one handle exposing every command plus the settlement consumer
//!
//! # Example
//!
//! ```rust,ignore
//! use ledger_service::Ledger;
//!
//! let ledger = Ledger::builder(accounts, history, events)
//!     .timezone(config.timezone()?)
//!     .limits(config.withdrawal_limits())
//!     .build();
//!
//! let consumer = ledger.consumer().spawn();
//! let committed = ledger.withdraw(1, 878, Amount::from_cents(200)).await?;
//! ```

pub mod config;
pub mod telemetry;

use std::sync::Arc;

use chrono_tz::America::Sao_Paulo;

use core_kernel::{Amount, Clock, SystemClock, Timezone};
use domain_ledger::{
    Account, AccountKey, AccountLocks, AccountPort, AccountStatus, Committed, ConsumerConfig,
    DailyLimitCalculator, DepositCommand, EventProvider, LedgerResult, Statement, StatementQuery,
    TransactionConsumer, TransactionEmitter, TransactionHistoryPort, TransferCommand,
    TransferredAccounts, UpdateStatusCommand, WithdrawalCommand, WithdrawalLimits,
};

pub use config::{ConfigError, LedgerConfig, LogFormat};
pub use telemetry::init_tracing;

/// Every ledger operation over one set of ports
///
/// All commands share a single `AccountLocks`, so mutations of the same
/// account are serialized across command kinds.
#[derive(Clone)]
pub struct Ledger {
    withdrawal: WithdrawalCommand,
    deposit: DepositCommand,
    transfer: TransferCommand,
    update_status: UpdateStatusCommand,
    statement: StatementQuery,
    events: Arc<dyn EventProvider>,
    history: Arc<dyn TransactionHistoryPort>,
    consumer_config: ConsumerConfig,
}

impl Ledger {
    /// Starts a builder with system time, the default ceiling and São Paulo business days
    pub fn builder(
        accounts: Arc<dyn AccountPort>,
        history: Arc<dyn TransactionHistoryPort>,
        events: Arc<dyn EventProvider>,
    ) -> LedgerBuilder {
        LedgerBuilder {
            accounts,
            history,
            events,
            clock: Arc::new(SystemClock),
            timezone: Timezone::new(Sao_Paulo),
            limits: WithdrawalLimits::default(),
            consumer_config: ConsumerConfig::default(),
        }
    }

    pub async fn withdraw(
        &self,
        account_number: u64,
        agency: u64,
        amount: Amount,
    ) -> LedgerResult<Committed<Account>> {
        self.withdrawal.execute(account_number, agency, amount).await
    }

    pub async fn deposit(
        &self,
        account_number: u64,
        agency: u64,
        amount: Amount,
    ) -> LedgerResult<Committed<Account>> {
        self.deposit.execute(account_number, agency, amount).await
    }

    pub async fn transfer(
        &self,
        from: AccountKey,
        to: AccountKey,
        amount: Amount,
    ) -> LedgerResult<Committed<TransferredAccounts>> {
        self.transfer.execute(from, to, amount).await
    }

    pub async fn update_status(
        &self,
        account_number: u64,
        agency: u64,
        status: AccountStatus,
    ) -> LedgerResult<Account> {
        self.update_status.execute(account_number, agency, status).await
    }

    pub async fn statement(
        &self,
        account_number: u64,
        agency: u64,
        from_day: chrono::NaiveDate,
        to_day: chrono::NaiveDate,
    ) -> LedgerResult<Statement> {
        self.statement.execute(account_number, agency, from_day, to_day).await
    }

    /// A settlement consumer reading from this ledger's event provider
    pub fn consumer(&self) -> TransactionConsumer {
        TransactionConsumer::new(
            Arc::clone(&self.events),
            Arc::clone(&self.history),
            self.consumer_config,
        )
    }
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("consumer_config", &self.consumer_config)
            .finish_non_exhaustive()
    }
}

/// Builder for `Ledger`
pub struct LedgerBuilder {
    accounts: Arc<dyn AccountPort>,
    history: Arc<dyn TransactionHistoryPort>,
    events: Arc<dyn EventProvider>,
    clock: Arc<dyn Clock>,
    timezone: Timezone,
    limits: WithdrawalLimits,
    consumer_config: ConsumerConfig,
}

impl LedgerBuilder {
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn timezone(mut self, timezone: Timezone) -> Self {
        self.timezone = timezone;
        self
    }

    pub fn limits(mut self, limits: WithdrawalLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn consumer_config(mut self, config: ConsumerConfig) -> Self {
        self.consumer_config = config;
        self
    }

    /// Applies the timezone, ceiling and retry settings from configuration
    pub fn configure(self, config: &LedgerConfig) -> Result<Self, ConfigError> {
        Ok(self
            .timezone(config.timezone()?)
            .limits(config.withdrawal_limits())
            .consumer_config(config.consumer_config()))
    }

    pub fn build(self) -> Ledger {
        let locks = Arc::new(AccountLocks::new());
        let emitter = TransactionEmitter::new(Arc::clone(&self.events));
        let calculator =
            DailyLimitCalculator::new(Arc::clone(&self.history), Arc::clone(&self.clock), self.timezone);

        Ledger {
            withdrawal: WithdrawalCommand::new(
                Arc::clone(&self.accounts),
                calculator,
                self.limits,
                emitter.clone(),
                Arc::clone(&locks),
                Arc::clone(&self.clock),
            ),
            deposit: DepositCommand::new(
                Arc::clone(&self.accounts),
                emitter.clone(),
                Arc::clone(&locks),
                Arc::clone(&self.clock),
            ),
            transfer: TransferCommand::new(
                Arc::clone(&self.accounts),
                emitter,
                Arc::clone(&locks),
                Arc::clone(&self.clock),
            ),
            update_status: UpdateStatusCommand::new(Arc::clone(&self.accounts), locks),
            statement: StatementQuery::new(self.accounts, Arc::clone(&self.history), self.timezone),
            events: self.events,
            history: self.history,
            consumer_config: self.consumer_config,
        }
    }
}
