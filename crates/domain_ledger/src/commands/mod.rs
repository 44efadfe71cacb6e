//! Ledger commands
//!
//! Each command receives its collaborators explicitly at construction and
//! serializes on the accounts it touches through `AccountLocks` for the
//! whole read, validate, write sequence.
//!
//! Balance-mutating commands return `Committed<T>`: the stored result, the
//! transaction record, and a receipt for the asynchronous publish. A publish
//! failure never turns a committed command into an error.

mod deposit;
mod withdrawal;
mod transfer;
mod update_status;

pub use deposit::DepositCommand;
pub use withdrawal::WithdrawalCommand;
pub use transfer::{TransferCommand, TransferredAccounts};
pub use update_status::UpdateStatusCommand;

use core_kernel::{Amount, PortError};

use crate::account::Account;
use crate::error::LedgerError;
use crate::events::PublishReceipt;
use crate::ports::AccountPort;
use crate::transaction::Transaction;

/// Outcome of a committed balance mutation
#[derive(Debug)]
pub struct Committed<T> {
    /// Stored state after the mutation
    pub value: T,
    /// Record handed to the event pipeline
    pub transaction: Transaction,
    /// Outcome of the asynchronous publish
    pub publish: PublishReceipt,
}

/// Loads an account by natural key, mapping absence to `AccountNotFound`
pub(crate) async fn find_account(
    accounts: &dyn AccountPort,
    account_number: u64,
    agency: u64,
) -> Result<Account, LedgerError> {
    match accounts.find_by_number_and_agency(account_number, agency).await {
        Ok(account) => Ok(account),
        Err(PortError::NotFound { .. }) => Err(LedgerError::AccountNotFound { account_number, agency }),
        Err(err) => Err(LedgerError::Storage(err)),
    }
}

pub(crate) fn ensure_positive(amount: Amount) -> Result<(), LedgerError> {
    if amount.is_zero() {
        Err(LedgerError::InvalidAmount)
    } else {
        Ok(())
    }
}
