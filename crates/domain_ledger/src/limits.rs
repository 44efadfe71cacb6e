//! Daily withdrawal ceiling
//!
//! The ceiling applies to the sum of settled withdrawals whose timestamp falls
//! inside the current local calendar day, `[start of today, start of tomorrow)`
//! in the configured timezone. Transfers and deposits do not count.

use std::sync::Arc;
use tracing::instrument;

use core_kernel::{AccountId, Amount, Clock, Timezone};

use crate::account::Account;
use crate::error::LedgerError;
use crate::ports::TransactionHistoryPort;

/// Default ceiling: 2000.00 in cents
pub const DEFAULT_DAILY_WITHDRAWAL_CEILING: Amount = Amount::from_cents(200_000);

/// Withdrawal ceiling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawalLimits {
    /// Ceiling used when an account has no override
    pub default_daily_ceiling: Amount,
}

impl Default for WithdrawalLimits {
    fn default() -> Self {
        Self {
            default_daily_ceiling: DEFAULT_DAILY_WITHDRAWAL_CEILING,
        }
    }
}

impl WithdrawalLimits {
    pub fn new(default_daily_ceiling: Amount) -> Self {
        Self { default_daily_ceiling }
    }

    /// The ceiling that applies to an account
    pub fn ceiling_for(&self, account: &Account) -> Amount {
        account.daily_withdrawal_limit.unwrap_or(self.default_daily_ceiling)
    }

    /// Rejects the withdrawal iff `withdrawn_today + amount > ceiling`
    ///
    /// A sum that overflows counts as exceeding the ceiling.
    pub fn check(&self, withdrawn_today: Amount, amount: Amount, ceiling: Amount) -> Result<(), LedgerError> {
        match withdrawn_today.checked_add(amount) {
            Ok(total) if total <= ceiling => Ok(()),
            _ => Err(LedgerError::DailyWithdrawalLimitExceeded {
                withdrawn_today,
                requested: amount,
                ceiling,
            }),
        }
    }
}

/// Computes how much an account has withdrawn today
///
/// Reads settled history only. A withdrawal committed moments ago whose event
/// has not been consumed yet is not counted.
#[derive(Clone)]
pub struct DailyLimitCalculator {
    history: Arc<dyn TransactionHistoryPort>,
    clock: Arc<dyn Clock>,
    timezone: Timezone,
}

impl DailyLimitCalculator {
    /// Creates a calculator
    ///
    /// # Arguments
    ///
    /// * `history` - Settled transaction history
    /// * `clock` - Source of "now"
    /// * `timezone` - Timezone whose calendar day bounds the window
    pub fn new(history: Arc<dyn TransactionHistoryPort>, clock: Arc<dyn Clock>, timezone: Timezone) -> Self {
        Self { history, clock, timezone }
    }

    pub fn timezone(&self) -> Timezone {
        self.timezone
    }

    /// Sum of today's settled withdrawals from the account
    #[instrument(skip(self), fields(account_id = %account_id))]
    pub async fn extract_today(&self, account_id: AccountId) -> Result<Amount, LedgerError> {
        let today = self.clock.today(&self.timezone);
        let window = self.timezone.day_window(today)?;

        let total = self
            .history
            .withdrawn_between(account_id, window.start, window.end)
            .await?;
        Ok(total)
    }
}

impl std::fmt::Debug for DailyLimitCalculator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DailyLimitCalculator")
            .field("timezone", &self.timezone)
            .finish_non_exhaustive()
    }
}
