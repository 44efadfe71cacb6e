//! Deposit command

use std::sync::Arc;
use tracing::{info, instrument};

use core_kernel::{Amount, Clock};

use super::{ensure_positive, find_account, Committed};
use crate::account::{Account, AccountKey};
use crate::error::LedgerError;
use crate::events::TransactionEmitter;
use crate::locks::AccountLocks;
use crate::ports::AccountPort;
use crate::transaction::Transaction;

/// Credits an active account
#[derive(Clone)]
pub struct DepositCommand {
    accounts: Arc<dyn AccountPort>,
    emitter: TransactionEmitter,
    locks: Arc<AccountLocks>,
    clock: Arc<dyn Clock>,
}

impl DepositCommand {
    pub fn new(
        accounts: Arc<dyn AccountPort>,
        emitter: TransactionEmitter,
        locks: Arc<AccountLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            accounts,
            emitter,
            locks,
            clock,
        }
    }

    /// Deposits `amount` into the account identified by number and agency
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

        account.credit(amount)?;

        let stored = self.accounts.update(&account).await?;
        let transaction = Transaction::deposit(stored.id, amount, self.clock.now());
        info!(
            account_id = %stored.id,
            transaction_id = %transaction.id,
            balance = stored.balance.cents(),
            "deposit committed"
        );

        let publish = self.emitter.emit(&transaction);
        Ok(Committed {
            value: stored,
            transaction,
            publish,
        })
    }
}
