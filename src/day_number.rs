//! # Day Number Module
//!
//! Converts a calendar date into the integer suffix embedded in every output file name.
//!
//! Two policies exist and they are not numerically equivalent:
//!
//! - [`DayNumberPolicy::Anchored`] counts whole calendar days from a fixed anchor date.
//! - [`DayNumberPolicy::DayOfYear`] is the legacy scheme: day of the year minus a constant.
//!   It restarts every January, so mixing it with the anchored sequence corrupts naming.

use chrono::{Datelike, NaiveDate};
use log::debug;
use std::fmt;
use std::str::FromStr;

use crate::errors::PipelineError;

/// Anchor date of the canonical sequence
pub const DEFAULT_BASE_DATE: (i32, u32, u32) = (2025, 7, 14);
/// Day number assigned to the anchor date
pub const DEFAULT_BASE_NUMBER: i64 = 53;
/// Offset subtracted from the day of the year by the legacy policy
pub const DEFAULT_DAY_OF_YEAR_OFFSET: i64 = 85;

/// Integer suffix used in output file names for a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayNumber(pub i64);

impl fmt::Display for DayNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a date is turned into a [`DayNumber`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayNumberPolicy {
    /// `base_number + (date - base_date)` in whole calendar days
    Anchored { base_date: NaiveDate, base_number: i64 },
    /// `ordinal(date) - offset`, with the ordinal starting at 1 on January 1st
    DayOfYear { offset: i64 },
}

impl DayNumberPolicy {
    /// The legacy day-of-year policy with its historical offset
    pub fn legacy_day_of_year() -> Self {
        DayNumberPolicy::DayOfYear {
            offset: DEFAULT_DAY_OF_YEAR_OFFSET,
        }
    }

    /// Compute the day number for `date`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use chrono::NaiveDate;
    /// use phone_buckets::day_number::{DayNumber, DayNumberPolicy};
    ///
    /// let policy = DayNumberPolicy::default();
    /// let date = NaiveDate::from_ymd_opt(2025, 7, 15).unwrap();
    /// assert_eq!(policy.day_number(date), DayNumber(54));
    /// ```
    pub fn day_number(&self, date: NaiveDate) -> DayNumber {
        let number = match *self {
            DayNumberPolicy::Anchored {
                base_date,
                base_number,
            } => base_number.saturating_add(date.signed_duration_since(base_date).num_days()),
            DayNumberPolicy::DayOfYear { offset } => i64::from(date.ordinal()).saturating_sub(offset),
        };
        debug!("Day number for {date} under {self:?}: {number}");
        DayNumber(number)
    }
}

impl Default for DayNumberPolicy {
    fn default() -> Self {
        let (year, month, day) = DEFAULT_BASE_DATE;
        DayNumberPolicy::Anchored {
            // The constant is a valid calendar date
            base_date: NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default(),
            base_number: DEFAULT_BASE_NUMBER,
        }
    }
}

impl FromStr for DayNumberPolicy {
    type Err = PipelineError;

    /// Parses the policy name only; anchors and offsets get their defaults.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anchored" => Ok(DayNumberPolicy::default()),
            "day-of-year" | "day_of_year" => Ok(DayNumberPolicy::legacy_day_of_year()),
            other => Err(PipelineError::Config(format!(
                "unknown day number policy '{other}' (expected 'anchored' or 'day-of-year')"
            ))),
        }
    }
}
