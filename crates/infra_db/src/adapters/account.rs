//! PostgreSQL Account Adapter
//!
//! Implements `AccountPort` on top of `AccountRepository`. Single-account
//! writes are version-checked; two-account writes additionally hold row
//! locks for the duration of one SQL transaction.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::PostgresAccountAdapter;
//! use domain_ledger::AccountPort;
//! use std::sync::Arc;
//!
//! let accounts: Arc<dyn AccountPort> = Arc::new(PostgresAccountAdapter::new(pool));
//! let account = accounts.find_by_number_and_agency(1, 878).await?;
//! ```

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_ledger::{Account, AccountKey, AccountPort};

use crate::repositories::AccountRepository;

/// PostgreSQL-backed implementation of the AccountPort trait
///
/// # Error Handling
///
/// Database errors are translated to `PortError` variants:
/// - missing rows -> `PortError::NotFound`
/// - stale versions and lock contention -> `PortError::Conflict`
/// - check constraint failures -> `PortError::Validation`
/// - other errors -> `PortError::Internal`
#[derive(Debug, Clone)]
pub struct PostgresAccountAdapter {
    repository: AccountRepository,
    pool: PgPool,
}

impl PostgresAccountAdapter {
    /// Creates a new PostgreSQL account adapter
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: AccountRepository::new(pool.clone()),
            pool,
        }
    }

    /// Returns a reference to the underlying repository
    ///
    /// Account creation is not part of the port, so seeding goes through here.
    pub fn repository(&self) -> &AccountRepository {
        &self.repository
    }

    /// Inserts a new account row
    #[instrument(skip(self, account), fields(account = %account.key()))]
    pub async fn open(&self, account: &Account) -> Result<Account, PortError> {
        let row = self.repository.insert(account).await?;
        Ok(Account::try_from(row)?)
    }
}

impl DomainPort for PostgresAccountAdapter {}

#[async_trait]
impl HealthCheckable for PostgresAccountAdapter {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, "postgres-account-adapter").await
    }
}

#[async_trait]
impl AccountPort for PostgresAccountAdapter {
    #[instrument(skip(self))]
    async fn find_by_number_and_agency(
        &self,
        account_number: u64,
        agency: u64,
    ) -> Result<Account, PortError> {
        debug!("Fetching account by natural key");

        let row = self
            .repository
            .find_by_number_and_agency(account_number, agency)
            .await?
            .ok_or_else(|| PortError::not_found("Account", AccountKey::new(agency, account_number)))?;

        Ok(Account::try_from(row)?)
    }

    #[instrument(skip(self, account), fields(account_id = %account.id, version = account.version))]
    async fn update(&self, account: &Account) -> Result<Account, PortError> {
        let row = self.repository.update_versioned(account).await?;
        Ok(Account::try_from(row)?)
    }

    #[instrument(
        skip(self, first, second),
        fields(first = %first.id, second = %second.id)
    )]
    async fn update_balance_transaction(
        &self,
        first: &Account,
        second: &Account,
    ) -> Result<(Account, Account), PortError> {
        if first.id == second.id {
            return Err(PortError::validation("cannot update the same account twice in one transaction"));
        }

        let (first_row, second_row) = self.repository.update_pair(first, second).await?;
        debug!("Committed two-account balance update");

        Ok((Account::try_from(first_row)?, Account::try_from(second_row)?))
    }
}
