//! Account repository implementation
//!
//! Every write is a compare-and-swap on the `version` column. Two-row
//! balance updates lock both rows with `SELECT ... FOR UPDATE` in
//! `account_id` order before writing, so concurrent transfers over the same
//! pair cannot deadlock.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use core_kernel::{AccountId, CarrierId};
use domain_ledger::{Account, AccountStatus as DomainAccountStatus};

use super::{amount_from_bigint, amount_to_bigint, from_bigint, to_bigint};
use crate::error::DatabaseError;

const ACCOUNT_COLUMNS: &str = "account_id, carrier_id, cpf, agency, account_number, balance, \
     status, daily_withdrawal_limit, version, created_at";

/// Account status as stored in the `account_status` enum type
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Blocked,
    Closed,
}

impl From<DomainAccountStatus> for AccountStatus {
    fn from(status: DomainAccountStatus) -> Self {
        match status {
            DomainAccountStatus::Active => AccountStatus::Active,
            DomainAccountStatus::Blocked => AccountStatus::Blocked,
            DomainAccountStatus::Closed => AccountStatus::Closed,
        }
    }
}

impl From<AccountStatus> for DomainAccountStatus {
    fn from(status: AccountStatus) -> Self {
        match status {
            AccountStatus::Active => DomainAccountStatus::Active,
            AccountStatus::Blocked => DomainAccountStatus::Blocked,
            AccountStatus::Closed => DomainAccountStatus::Closed,
        }
    }
}

/// Account row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AccountRow {
    pub account_id: Uuid,
    pub carrier_id: Uuid,
    pub cpf: String,
    pub agency: i64,
    pub account_number: i64,
    pub balance: i64,
    pub status: AccountStatus,
    pub daily_withdrawal_limit: Option<i64>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DatabaseError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: AccountId::from(row.account_id),
            carrier_id: CarrierId::from(row.carrier_id),
            cpf: row.cpf,
            agency: from_bigint("agency", row.agency)?,
            account_number: from_bigint("account_number", row.account_number)?,
            balance: amount_from_bigint("balance", row.balance)?,
            status: row.status.into(),
            daily_withdrawal_limit: row
                .daily_withdrawal_limit
                .map(|limit| amount_from_bigint("daily_withdrawal_limit", limit))
                .transpose()?,
            version: row.version,
            created_at: row.created_at,
        })
    }
}

/// Repository for account rows
#[derive(Debug, Clone)]
pub struct AccountRepository {
    pool: PgPool,
}

impl AccountRepository {
    /// Creates a new AccountRepository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new account
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::DuplicateEntry` if the id or the natural key is taken
    pub async fn insert(&self, account: &Account) -> Result<AccountRow, DatabaseError> {
        let limit = account
            .daily_withdrawal_limit
            .map(|limit| amount_to_bigint("daily_withdrawal_limit", limit))
            .transpose()?;

        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            INSERT INTO accounts (
                account_id, carrier_id, cpf, agency, account_number, balance,
                status, daily_withdrawal_limit, version, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(*account.id.as_uuid())
        .bind(*account.carrier_id.as_uuid())
        .bind(&account.cpf)
        .bind(to_bigint("agency", account.agency)?)
        .bind(to_bigint("account_number", account.account_number)?)
        .bind(amount_to_bigint("balance", account.balance)?)
        .bind(AccountStatus::from(account.status))
        .bind(limit)
        .bind(account.version)
        .bind(account.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    /// Finds an account by its natural key
    pub async fn find_by_number_and_agency(
        &self,
        account_number: u64,
        agency: u64,
    ) -> Result<Option<AccountRow>, DatabaseError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = $1 AND agency = $2"
        ))
        .bind(to_bigint("account_number", account_number)?)
        .bind(to_bigint("agency", agency)?)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Finds an account by id
    pub async fn find_by_id(&self, account_id: Uuid) -> Result<Option<AccountRow>, DatabaseError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1"
        ))
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    /// Writes balance, status and limit if the stored version matches
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError::VersionConflict` if the row changed since it was read
    pub async fn update_versioned(&self, account: &Account) -> Result<AccountRow, DatabaseError> {
        let mut conn = self.pool.acquire().await?;
        Self::write_versioned(&mut conn, account).await
    }

    /// Writes two accounts in one transaction
    ///
    /// Both rows are locked in `account_id` order, then each is written with
    /// the same version check as `update_versioned`. Any failure rolls back
    /// both writes.
    pub async fn update_pair(
        &self,
        first: &Account,
        second: &Account,
    ) -> Result<(AccountRow, AccountRow), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let ids = vec![*first.id.as_uuid(), *second.id.as_uuid()];
        let locked: Vec<Uuid> = sqlx::query_scalar(
            "SELECT account_id FROM accounts WHERE account_id = ANY($1) ORDER BY account_id FOR UPDATE",
        )
        .bind(&ids)
        .fetch_all(&mut *tx)
        .await?;

        for id in [first.id, second.id] {
            if !locked.contains(id.as_uuid()) {
                return Err(DatabaseError::not_found("Account", id));
            }
        }

        let first_row = Self::write_versioned(&mut tx, first).await?;
        let second_row = Self::write_versioned(&mut tx, second).await?;

        tx.commit().await?;
        Ok((first_row, second_row))
    }

    async fn write_versioned(conn: &mut PgConnection, account: &Account) -> Result<AccountRow, DatabaseError> {
        let limit = account
            .daily_withdrawal_limit
            .map(|limit| amount_to_bigint("daily_withdrawal_limit", limit))
            .transpose()?;

        let row = sqlx::query_as::<_, AccountRow>(&format!(
            r#"
            UPDATE accounts
            SET balance = $2,
                status = $3,
                daily_withdrawal_limit = $4,
                version = version + 1,
                updated_at = now()
            WHERE account_id = $1 AND version = $5
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(*account.id.as_uuid())
        .bind(amount_to_bigint("balance", account.balance)?)
        .bind(AccountStatus::from(account.status))
        .bind(limit)
        .bind(account.version)
        .fetch_optional(&mut *conn)
        .await?;

        row.ok_or_else(|| {
            DatabaseError::VersionConflict(format!(
                "account {} is missing or no longer at version {}",
                account.id, account.version
            ))
        })
    }
}
