//! Time handling for ledger operations
//!
//! The daily withdrawal ceiling is evaluated per calendar day in the bank's
//! timezone, not in UTC. This module provides:
//! - `Timezone`: a serde-friendly wrapper around `chrono_tz::Tz`
//! - `DayWindow`: the half-open UTC interval covering one local day
//! - `Clock`: an injectable source of "now" so tests can pin the date

use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors related to temporal operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemporalError {
    #[error("Invalid period: start {start} must not be after end {end}")]
    InvalidPeriod {
        start: String,
        end: String,
    },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Local midnight does not exist on {0}")]
    NonexistentLocalTime(NaiveDate),
}

/// Timezone wrapper used for business-day calculations
///
/// Wraps chrono_tz::Tz with custom serialization support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timezone(pub Tz);

impl Serialize for Timezone {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.0.name())
    }
}

impl<'de> Deserialize<'de> for Timezone {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

impl FromStr for Timezone {
    type Err = TemporalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tz::from_str(s)
            .map(Timezone)
            .map_err(|_| TemporalError::UnknownTimezone(s.to_string()))
    }
}

impl fmt::Display for Timezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.name())
    }
}

impl Timezone {
    pub fn new(tz: Tz) -> Self {
        Self(tz)
    }

    /// Returns the local calendar date of a UTC instant
    pub fn local_date(&self, utc: DateTime<Utc>) -> NaiveDate {
        utc.with_timezone(&self.0).date_naive()
    }

    /// Gets the first instant of the given local date as UTC
    ///
    /// When a DST transition skips midnight the day starts at the first
    /// local instant that exists, probed in 30 minute steps.
    pub fn start_of_day(&self, date: NaiveDate) -> Result<DateTime<Utc>, TemporalError> {
        let midnight: NaiveDateTime = date
            .and_hms_opt(0, 0, 0)
            .ok_or(TemporalError::NonexistentLocalTime(date))?;

        for step in 0..=6 {
            let probe = midnight + Duration::minutes(30 * step);
            match self.0.from_local_datetime(&probe) {
                LocalResult::Single(dt) => return Ok(dt.with_timezone(&Utc)),
                LocalResult::Ambiguous(earliest, _) => return Ok(earliest.with_timezone(&Utc)),
                LocalResult::None => continue,
            }
        }

        Err(TemporalError::NonexistentLocalTime(date))
    }

    /// Returns the UTC window covering the given local date
    pub fn day_window(&self, date: NaiveDate) -> Result<DayWindow, TemporalError> {
        let next = date
            .succ_opt()
            .ok_or(TemporalError::NonexistentLocalTime(date))?;

        Ok(DayWindow {
            start: self.start_of_day(date)?,
            end: self.start_of_day(next)?,
        })
    }

    /// Returns the UTC window covering an inclusive range of local dates
    ///
    /// # Errors
    ///
    /// Returns `TemporalError::InvalidPeriod` if `from` is after `to`
    pub fn range_window(&self, from: NaiveDate, to: NaiveDate) -> Result<DayWindow, TemporalError> {
        if from > to {
            return Err(TemporalError::InvalidPeriod {
                start: from.to_string(),
                end: to.to_string(),
            });
        }

        Ok(DayWindow {
            start: self.day_window(from)?.start,
            end: self.day_window(to)?.end,
        })
    }
}

impl Default for Timezone {
    fn default() -> Self {
        Self(chrono_tz::UTC)
    }
}

/// A half-open interval `[start, end)` of UTC instants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    /// Returns true if the instant falls inside the window
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant < self.end
    }
}

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// The local calendar date of `now()` in the given timezone
    fn today(&self, tz: &Timezone) -> NaiveDate {
        tz.local_date(self.now())
    }
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utc_day_window() {
        let tz = Timezone::default();
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let window = tz.day_window(date).unwrap();

        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 3, 16, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_window_is_half_open() {
        let tz = Timezone::default();
        let window = tz.day_window(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()).unwrap();

        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
    }

    #[test]
    fn test_unknown_timezone() {
        let result: Result<Timezone, _> = "Mars/Olympus_Mons".parse();
        assert!(matches!(result, Err(TemporalError::UnknownTimezone(_))));
    }
}
