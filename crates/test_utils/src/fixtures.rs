//! Pre-built Test Fixtures
//!
//! Provides ready-to-use test data for the ledger. The values mirror the
//! reference scenarios: agency 878, a 300 cent balance, a 200000 cent
//! daily ceiling, and business days in São Paulo.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::America::Sao_Paulo;

use core_kernel::{Amount, CarrierId, FixedClock, Timezone};
use domain_ledger::Account;

/// Agency used by every fixture account
pub const FIXTURE_AGENCY: u64 = 878;

/// CPF used by every fixture account
pub const FIXTURE_CPF: &str = "12345678909";

/// Fixture for Amount test data
pub struct AmountFixtures;

impl AmountFixtures {
    /// Opening balance of the reference withdrawal scenario
    pub fn opening_balance() -> Amount {
        Amount::from_cents(300)
    }

    /// A withdrawal that fits within the opening balance
    pub fn small_withdrawal() -> Amount {
        Amount::from_cents(200)
    }

    /// A withdrawal larger than the opening balance
    pub fn large_withdrawal() -> Amount {
        Amount::from_cents(2_000)
    }

    /// The default daily ceiling
    pub fn daily_ceiling() -> Amount {
        Amount::from_cents(200_000)
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Business-day timezone
    pub fn sao_paulo() -> Timezone {
        Timezone::new(Sao_Paulo)
    }

    /// 12:00 local time in São Paulo on 1 May 2024
    pub fn business_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap()
    }

    /// The local date of `business_noon`
    pub fn business_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    /// 23:30 local time on the previous São Paulo day
    pub fn previous_evening() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 2, 30, 0).unwrap()
    }

    /// A clock pinned at `business_noon`
    pub fn fixed_clock() -> FixedClock {
        FixedClock::at(Self::business_noon())
    }
}

/// Fixture for account test data
pub struct AccountFixtures;

impl AccountFixtures {
    /// Active account `number` at the fixture agency with the given balance
    pub fn active(account_number: u64, cents: u64) -> Account {
        Account::open(CarrierId::new(), FIXTURE_CPF, FIXTURE_AGENCY, account_number)
            .with_balance(Amount::from_cents(cents))
    }

    /// Account 1 holding the opening balance
    pub fn reference() -> Account {
        Self::active(1, AmountFixtures::opening_balance().cents())
    }
}
