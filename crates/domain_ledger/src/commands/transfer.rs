//! Transfer command

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

/// Both sides of a committed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferredAccounts {
    pub source: Account,
    pub destination: Account,
}

/// Moves money between two accounts atomically
///
/// Transfers do not count toward the daily withdrawal ceiling.
#[derive(Clone)]
pub struct TransferCommand {
    accounts: Arc<dyn AccountPort>,
    emitter: TransactionEmitter,
    locks: Arc<AccountLocks>,
    clock: Arc<dyn Clock>,
}

impl TransferCommand {
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

    /// Transfers `amount` from one account to another
    ///
    /// The sum of both balances is unchanged. Both rows are written in one
    /// storage transaction; on failure neither balance moves.
    ///
    /// # Errors
    ///
    /// * `SameAccountTransfer` - both keys name the same account
    /// * `AccountNotFound` - either account is missing
    /// * `AccountNotActive` - either account is blocked or closed
    /// * `InsufficientBalance` - the source cannot cover the amount
    /// * `BalanceOverflow` - the destination cannot hold the result
    /// * `Storage` - the store failed; nothing changed
    #[instrument(skip_all, fields(from = %from, to = %to, amount = amount.cents()))]
    pub async fn execute(
        &self,
        from: AccountKey,
        to: AccountKey,
        amount: Amount,
    ) -> Result<Committed<TransferredAccounts>, LedgerError> {
        if from == to {
            return Err(LedgerError::SameAccountTransfer);
        }
        ensure_positive(amount)?;
        let _guards = self.locks.lock_pair(from, to).await;

        let mut source = find_account(self.accounts.as_ref(), from.account_number, from.agency).await?;
        let mut destination = find_account(self.accounts.as_ref(), to.account_number, to.agency).await?;
        source.ensure_active()?;
        destination.ensure_active()?;

        source.balance = source
            .balance
            .checked_sub(amount)
            .map_err(|_| LedgerError::InsufficientBalance {
                balance: source.balance,
                requested: amount,
            })?;
        destination.credit(amount)?;

        let (source, destination) = self
            .accounts
            .update_balance_transaction(&source, &destination)
            .await?;

        let transaction = Transaction::transfer(source.id, destination.id, amount, self.clock.now());
        info!(
            source_id = %source.id,
            destination_id = %destination.id,
            transaction_id = %transaction.id,
            "transfer committed"
        );

        let publish = self.emitter.emit(&transaction);
        Ok(Committed {
            value: TransferredAccounts { source, destination },
            transaction,
            publish,
        })
    }
}
