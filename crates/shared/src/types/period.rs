//! Accounting period: one calendar month.
//!
//! The pipeline processes transactions a month at a time. Ledger and
//! transaction-source tables are range-partitioned on the same boundaries,
//! so the period type is the single source of truth for month windows.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from constructing or parsing a [`Period`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodError {
    /// Month outside 1..=12.
    #[error("invalid month {month}: must be between 1 and 12")]
    InvalidMonth {
        /// The rejected month number.
        month: u32,
    },

    /// Year/month pair not representable as a date.
    #[error("period out of range: {year:04}-{month:02}")]
    OutOfRange {
        /// The rejected year.
        year: i32,
        /// The rejected month number.
        month: u32,
    },

    /// Input did not look like `YYYY-MM`.
    #[error("invalid period format {input:?}: expected YYYY-MM")]
    Format {
        /// The rejected input.
        input: String,
    },
}

/// A calendar month, stored as a half-open date window.
///
/// `start` is the first day of the month and `end_exclusive` the first day
/// of the next month, so `start <= d < end_exclusive` selects exactly the
/// month's dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    start: NaiveDate,
    end_exclusive: NaiveDate,
}

impl Period {
    /// Creates the period for the given year and month.
    ///
    /// # Errors
    ///
    /// Returns an error if the month is not 1..=12 or the dates are not
    /// representable.
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::InvalidMonth { month });
        }
        let start = NaiveDate::from_ymd_opt(year, month, 1)
            .ok_or(PeriodError::OutOfRange { year, month })?;
        let end_exclusive = start
            .checked_add_months(Months::new(1))
            .ok_or(PeriodError::OutOfRange { year, month })?;
        Ok(Self {
            start,
            end_exclusive,
        })
    }

    /// Creates the period containing the given date.
    ///
    /// # Errors
    ///
    /// Returns an error if the following month start is not representable.
    pub fn containing(date: NaiveDate) -> Result<Self, PeriodError> {
        Self::new(date.year(), date.month())
    }

    /// First day of the month.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day of the following month.
    #[must_use]
    pub const fn end_exclusive(&self) -> NaiveDate {
        self.end_exclusive
    }

    /// The period's year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.start.year()
    }

    /// The period's month number (1..=12).
    #[must_use]
    pub fn month(&self) -> u32 {
        self.start.month()
    }

    /// Compact `YYYYMM` label used in journal entry numbers and partitions.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{:04}{:02}", self.year(), self.month())
    }

    /// Number of days in the month.
    #[must_use]
    pub fn days(&self) -> u32 {
        // A month spans 28 to 31 days.
        u32::try_from((self.end_exclusive - self.start).num_days()).unwrap_or(31)
    }

    /// Whether the date falls inside the month window.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end_exclusive
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl std::str::FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = || PeriodError::Format {
            input: s.to_string(),
        };
        let (year, month) = s.split_once('-').ok_or_else(format)?;
        let year: i32 = year.parse().map_err(|_| format())?;
        let month: u32 = month.parse().map_err(|_| format())?;
        Self::new(year, month)
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
