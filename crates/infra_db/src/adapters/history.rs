//! PostgreSQL Transaction History Adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, instrument};

use core_kernel::{AccountId, Amount, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_ledger::{AppendOutcome, Transaction, TransactionHistoryPort};

use crate::repositories::{amount_from_bigint, TransactionRepository};

/// PostgreSQL-backed implementation of the TransactionHistoryPort trait
#[derive(Debug, Clone)]
pub struct PostgresTransactionHistory {
    repository: TransactionRepository,
    pool: PgPool,
}

impl PostgresTransactionHistory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            repository: TransactionRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn repository(&self) -> &TransactionRepository {
        &self.repository
    }
}

impl DomainPort for PostgresTransactionHistory {}

#[async_trait]
impl HealthCheckable for PostgresTransactionHistory {
    async fn health_check(&self) -> HealthCheckResult {
        super::ping(&self.pool, "postgres-transaction-history").await
    }
}

#[async_trait]
impl TransactionHistoryPort for PostgresTransactionHistory {
    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id, kind = %transaction.kind))]
    async fn append(&self, transaction: &Transaction) -> Result<AppendOutcome, PortError> {
        let inserted = self.repository.insert_if_absent(transaction).await?;

        if inserted {
            Ok(AppendOutcome::Inserted)
        } else {
            debug!("Transaction already recorded");
            Ok(AppendOutcome::Duplicate)
        }
    }

    #[instrument(skip(self))]
    async fn withdrawn_between(
        &self,
        account: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Amount, PortError> {
        let total = self.repository.sum_withdrawn(account.into(), from, to).await?;
        Ok(amount_from_bigint("withdrawn", total)?)
    }

    #[instrument(skip(self))]
    async fn list_between(
        &self,
        account: AccountId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, PortError> {
        let rows = self.repository.list_between(account.into(), from, to).await?;

        rows.into_iter()
            .map(|row| Transaction::try_from(row).map_err(PortError::from))
            .collect()
    }
}
