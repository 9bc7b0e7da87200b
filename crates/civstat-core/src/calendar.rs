// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::StatError;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::fmt;

/// Calendar month key used for monthly aggregation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, StatError> {
        if !(1..=12).contains(&month) {
            return Err(StatError::invalid_input(format!(
                "month must be in 1..=12, got {month}"
            )));
        }
        Ok(Self { year, month })
    }

    /// Rounds a date down to its calendar month.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Every month from `start` through `end`, inclusive. Empty when `start > end`.
    pub fn range_inclusive(start: Self, end: Self) -> Vec<Self> {
        let mut out = vec![];
        let mut current = start;
        while current <= end {
            out.push(current);
            current = current.succ();
        }
        out
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Returns the week-ending date for `date` given the weekday a week closes on.
///
/// A date that already falls on `week_end` is its own week end.
pub fn week_ending(date: NaiveDate, week_end: Weekday) -> Result<NaiveDate, StatError> {
    let target = i64::from(week_end.num_days_from_monday());
    let current = i64::from(date.weekday().num_days_from_monday());
    let offset = (target - current).rem_euclid(7) as u64;
    date.checked_add_days(Days::new(offset)).ok_or_else(|| {
        StatError::invalid_input(format!(
            "week ending for {date} overflows the supported date range"
        ))
    })
}
