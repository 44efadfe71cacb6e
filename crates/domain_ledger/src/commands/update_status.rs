//! Account status changes

use std::sync::Arc;
use tracing::{info, instrument};

use super::find_account;
use crate::account::{Account, AccountKey, AccountStatus};
use crate::error::LedgerError;
use crate::locks::AccountLocks;
use crate::ports::AccountPort;

/// Blocks, reactivates or closes an account
///
/// Not a monetary transaction, so nothing is emitted.
#[derive(Clone)]
pub struct UpdateStatusCommand {
    accounts: Arc<dyn AccountPort>,
    locks: Arc<AccountLocks>,
}

impl UpdateStatusCommand {
    pub fn new(accounts: Arc<dyn AccountPort>, locks: Arc<AccountLocks>) -> Self {
        Self { accounts, locks }
    }

    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        account_number: u64,
        agency: u64,
        status: AccountStatus,
    ) -> Result<Account, LedgerError> {
        let _guard = self.locks.lock(AccountKey::new(agency, account_number)).await;

        let mut account = find_account(self.accounts.as_ref(), account_number, agency).await?;
        let previous = account.status;
        account.transition_to(status)?;

        let stored = self.accounts.update(&account).await?;
        info!(account_id = %stored.id, from = %previous, to = %stored.status, "account status changed");
        Ok(stored)
    }
}
