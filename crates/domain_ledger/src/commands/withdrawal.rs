//! Withdrawal command

use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{Amount, Clock};

use super::{ensure_positive, find_account, Committed};
use crate::account::{Account, AccountKey};
use crate::error::LedgerError;
use crate::events::TransactionEmitter;
use crate::limits::{DailyLimitCalculator, WithdrawalLimits};
use crate::locks::AccountLocks;
use crate::ports::AccountPort;
use crate::transaction::Transaction;

/// Debits an account, subject to its balance and daily ceiling
#[derive(Clone)]
pub struct WithdrawalCommand {
    accounts: Arc<dyn AccountPort>,
    calculator: DailyLimitCalculator,
    limits: WithdrawalLimits,
    emitter: TransactionEmitter,
    locks: Arc<AccountLocks>,
    clock: Arc<dyn Clock>,
}

impl WithdrawalCommand {
    pub fn new(
        accounts: Arc<dyn AccountPort>,
        calculator: DailyLimitCalculator,
        limits: WithdrawalLimits,
        emitter: TransactionEmitter,
        locks: Arc<AccountLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            calculator,
            limits,
            emitter,
            locks,
            clock,
        }
    }

    /// Withdraws `amount` from the account identified by number and agency
    ///
    /// Checks run in order: existence, status, daily ceiling, balance. The
    /// first failing check decides the error and nothing is mutated.
    ///
    /// # Errors
    ///
    /// * `AccountNotFound` - no account matches
    /// * `AccountNotActive` - the account is blocked or closed
    /// * `DailyWithdrawalLimitExceeded` - today's total would pass the ceiling
    /// * `InsufficientBalance` - the amount exceeds the balance
    /// * `Storage` - the store failed; the balance is unchanged
    #[instrument(skip(self, amount), fields(amount = amount.cents()))]
    pub async fn execute(
        &self,
        account_number: u64,
        agency: u64,
        amount: Amount,
    ) -> Result<Committed<Account>, LedgerError> {
        ensure_positive(amount)?;
        let _guard = self.locks.lock(AccountKey::new(agency, account_number)).await;

        let mut account = find_account(self.accounts.as_ref(), account_number, agency).await?;
        account.ensure_active()?;

        let withdrawn_today = self.calculator.extract_today(account.id).await?;
        let ceiling = self.limits.ceiling_for(&account);
        self.limits.check(withdrawn_today, amount, ceiling)?;

        account.balance = account
            .balance
            .checked_sub(amount)
            .map_err(|_| LedgerError::InsufficientBalance {
                balance: account.balance,
                requested: amount,
            })?;

        let stored = self.accounts.update(&account).await?;
        let transaction = Transaction::withdrawal(stored.id, amount, self.clock.now());
        info!(
            account_id = %stored.id,
            transaction_id = %transaction.id,
            balance = stored.balance.cents(),
            "withdrawal committed"
        );

        let publish = self.emitter.emit(&transaction);
        Ok(Committed {
            value: stored,
            transaction,
            publish,
        })
    }
}
