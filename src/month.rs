//! Calendar year-month values in `YYYY-MM` form

use crate::error::CostingError;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Earliest accepted year
pub const MIN_YEAR: i32 = 2000;

/// Latest accepted year
pub const MAX_YEAR: i32 = 2100;

/// A calendar month (`YYYY-MM`)
///
/// Ordering is chronological, so range filters like "strictly after the base
/// month, up to and including the target month" are plain comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Build a validated year-month
    pub fn new(year: i32, month: u32) -> Result<Self, CostingError> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) || !(1..=12).contains(&month) {
            return Err(CostingError::InvalidMonth {
                field: "month".to_string(),
                value: format!("{:04}-{:02}", year, month),
            });
        }
        Ok(Self { year, month })
    }

    /// Parse a `YYYY-MM` string, naming `field` in the error
    ///
    /// Requires exactly 7 ASCII characters with a literal `-` at index 4.
    pub fn parse_field(value: &str, field: &str) -> Result<Self, CostingError> {
        let invalid = || CostingError::InvalidMonth {
            field: field.to_string(),
            value: value.to_string(),
        };

        let bytes = value.as_bytes();
        if bytes.len() != 7 || bytes[4] != b'-' {
            return Err(invalid());
        }
        let digits_ok = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || b.is_ascii_digit());
        if !digits_ok {
            return Err(invalid());
        }

        let year: i32 = value[..4].parse().map_err(|_| invalid())?;
        let month: u32 = value[5..].parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }

    /// Month containing the given date
    ///
    /// Not range-checked. Stored dates are checked on entry
    /// (`ScheduledProductionEntry::new`); use `new` for untrusted input.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month
    pub fn next(&self) -> Self {
        if self.month == 12 {
            Self { year: self.year + 1, month: 1 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    /// Signed number of months from `self` to `other`
    pub fn months_until(&self, other: YearMonth) -> i32 {
        (other.year - self.year) * 12 + (other.month as i32 - self.month as i32)
    }

    /// First calendar day of the month
    pub fn first_day(&self) -> NaiveDate {
        // Always valid: year and month are range-checked on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Whether `date` falls inside this month
    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// Iterate months from `start` to `end` inclusive (empty if `start > end`)
    pub fn range_inclusive(start: YearMonth, end: YearMonth) -> MonthRange {
        MonthRange { next: Some(start), end }
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = CostingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_field(s, "month")
    }
}

impl TryFrom<String> for YearMonth {
    type Error = CostingError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

/// Inclusive iterator over calendar months
#[derive(Debug, Clone)]
pub struct MonthRange {
    next: Option<YearMonth>,
    end: YearMonth,
}

impl Iterator for MonthRange {
    type Item = YearMonth;

    fn next(&mut self) -> Option<YearMonth> {
        let current = self.next?;
        if current > self.end {
            self.next = None;
            return None;
        }
        self.next = if current == self.end { None } else { Some(current.next()) };
        Some(current)
    }
}
