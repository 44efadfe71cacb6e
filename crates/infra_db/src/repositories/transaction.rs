//! Transaction history repository implementation
//!
//! Rows are only ever inserted. The insert is idempotent on the
//! transaction id, which is what makes at-least-once settlement safe.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use core_kernel::{AccountId, TransactionId};
use domain_ledger::{Transaction, TransactionKind as DomainTransactionKind};

use super::{amount_from_bigint, amount_to_bigint};
use crate::error::DatabaseError;

/// Transaction kind as stored in the `transaction_kind` enum type
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "transaction_kind", rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
}

impl From<DomainTransactionKind> for TransactionKind {
    fn from(kind: DomainTransactionKind) -> Self {
        match kind {
            DomainTransactionKind::Deposit => TransactionKind::Deposit,
            DomainTransactionKind::Withdrawal => TransactionKind::Withdrawal,
            DomainTransactionKind::Transfer => TransactionKind::Transfer,
        }
    }
}

impl From<TransactionKind> for DomainTransactionKind {
    fn from(kind: TransactionKind) -> Self {
        match kind {
            TransactionKind::Deposit => DomainTransactionKind::Deposit,
            TransactionKind::Withdrawal => DomainTransactionKind::Withdrawal,
            TransactionKind::Transfer => DomainTransactionKind::Transfer,
        }
    }
}

/// Transaction row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    pub transaction_id: Uuid,
    pub kind: TransactionKind,
    pub amount: i64,
    pub source_account_id: Option<Uuid>,
    pub destination_account_id: Option<Uuid>,
    pub occurred_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = DatabaseError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Transaction {
            id: TransactionId::from(row.transaction_id),
            kind: row.kind.into(),
            amount: amount_from_bigint("amount", row.amount)?,
            source: row.source_account_id.map(AccountId::from),
            destination: row.destination_account_id.map(AccountId::from),
            occurred_at: row.occurred_at,
        })
    }
}

/// Repository for the append-only transaction history
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: PgPool,
}

impl TransactionRepository {
    /// Creates a new TransactionRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts the transaction unless a row with its id exists
    ///
    /// # Returns
    ///
    /// `true` if a row was written, `false` if it was already present
    pub async fn insert_if_absent(&self, transaction: &Transaction) -> Result<bool, DatabaseError> {
        let result = sqlx::query(
            r#"
            INSERT INTO transactions (
                transaction_id, kind, amount, source_account_id,
                destination_account_id, occurred_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (transaction_id) DO NOTHING
            "#,
        )
        .bind(*transaction.id.as_uuid())
        .bind(TransactionKind::from(transaction.kind))
        .bind(amount_to_bigint("amount", transaction.amount)?)
        .bind(transaction.source.map(Uuid::from))
        .bind(transaction.destination.map(Uuid::from))
        .bind(transaction.occurred_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Sums withdrawals from the account with `from <= occurred_at < to`
    pub async fn sum_withdrawn(
        &self,
        account_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64, DatabaseError> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(amount), 0)::BIGINT
            FROM transactions
            WHERE kind = 'withdrawal'
              AND source_account_id = $1
              AND occurred_at >= $2
              AND occurred_at < $3
            "#,
        )
        .bind(account_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    /// Lists rows touching the account in `[from, to)`, oldest first
    pub async fn list_between(
        &self,
        account_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TransactionRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            r#"
            SELECT transaction_id, kind, amount, source_account_id,
                   destination_account_id, occurred_at
            FROM transactions
            WHERE (source_account_id = $1 OR destination_account_id = $1)
              AND occurred_at >= $2
              AND occurred_at < $3
            ORDER BY occurred_at, transaction_id
            "#,
        )
        .bind(account_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
