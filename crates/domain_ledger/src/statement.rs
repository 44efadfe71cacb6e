//! Account statements
//!
//! A statement lists the settled transactions touching an account over an
//! inclusive range of local calendar days, each tagged as a credit or a debit
//! from the account's point of view.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use core_kernel::{AccountId, Amount, Timezone};

use crate::commands::find_account;
use crate::error::LedgerError;
use crate::ports::{AccountPort, TransactionHistoryPort};
use crate::transaction::{EntryDirection, Transaction};

/// One line of a statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementEntry {
    pub transaction: Transaction,
    pub direction: EntryDirection,
}

/// Settled activity of one account over a period
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub account_id: AccountId,
    pub agency: u64,
    pub account_number: u64,
    /// Balance at the time the statement was produced
    pub balance: Amount,
    /// First instant covered, inclusive
    pub period_start: DateTime<Utc>,
    /// Instant after the last one covered
    pub period_end: DateTime<Utc>,
    pub entries: Vec<StatementEntry>,
    pub total_credits: Amount,
    pub total_debits: Amount,
}

/// Builds statements from the settled history
#[derive(Clone)]
pub struct StatementQuery {
    accounts: Arc<dyn AccountPort>,
    history: Arc<dyn TransactionHistoryPort>,
    timezone: Timezone,
}

impl StatementQuery {
    pub fn new(
        accounts: Arc<dyn AccountPort>,
        history: Arc<dyn TransactionHistoryPort>,
        timezone: Timezone,
    ) -> Self {
        Self {
            accounts,
            history,
            timezone,
        }
    }

    /// Produces the statement for `from_day..=to_day` in the configured timezone
    ///
    /// # Errors
    ///
    /// * `InvalidPeriod` - `from_day` is after `to_day`
    /// * `AccountNotFound` - no account matches
    #[instrument(skip(self))]
    pub async fn execute(
        &self,
        account_number: u64,
        agency: u64,
        from_day: NaiveDate,
        to_day: NaiveDate,
    ) -> Result<Statement, LedgerError> {
        if from_day > to_day {
            return Err(LedgerError::InvalidPeriod {
                from: from_day,
                to: to_day,
            });
        }

        let account = find_account(self.accounts.as_ref(), account_number, agency).await?;
        let window = self.timezone.range_window(from_day, to_day)?;
        let transactions = self
            .history
            .list_between(account.id, window.start, window.end)
            .await?;

        let entries: Vec<StatementEntry> = transactions
            .into_iter()
            .filter_map(|transaction| {
                transaction
                    .direction_for(account.id)
                    .map(|direction| StatementEntry { transaction, direction })
            })
            .collect();

        let total_for = |wanted: EntryDirection| -> Amount {
            entries
                .iter()
                .filter(|e| e.direction == wanted)
                .map(|e| e.transaction.amount)
                .sum()
        };
        let total_credits = total_for(EntryDirection::Credit);
        let total_debits = total_for(EntryDirection::Debit);

        Ok(Statement {
            account_id: account.id,
            agency: account.agency,
            account_number: account.account_number,
            balance: account.balance,
            period_start: window.start,
            period_end: window.end,
            entries,
            total_credits,
            total_debits,
        })
    }
}
