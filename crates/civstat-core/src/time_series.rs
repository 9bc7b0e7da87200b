// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::StatError;
use chrono::{Datelike, NaiveDate};

/// Owned univariate series indexed by strictly increasing dates.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DatedSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl DatedSeries {
    /// Constructs a validated `DatedSeries`.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self, StatError> {
        if dates.is_empty() {
            return Err(StatError::invalid_input("dated series must be non-empty"));
        }
        if dates.len() != values.len() {
            return Err(StatError::invalid_input(format!(
                "dated series length mismatch: {} dates, {} values",
                dates.len(),
                values.len()
            )));
        }
        if let Some(idx) = dates.windows(2).position(|pair| pair[0] >= pair[1]) {
            return Err(StatError::invalid_input(format!(
                "dates must be strictly increasing: index {} ({}) is not after index {} ({})",
                idx + 1,
                dates[idx + 1],
                idx,
                dates[idx]
            )));
        }
        if let Some((idx, value)) = values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(StatError::invalid_input(format!(
                "dated series values must be finite: index {idx} has {value}"
            )));
        }
        Ok(Self { dates, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first_date(&self) -> NaiveDate {
        self.dates[0]
    }

    pub fn last_date(&self) -> NaiveDate {
        self.dates[self.dates.len() - 1]
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Splits at a calendar-year boundary: observations dated before `year`
    /// form the first part, the rest the second. Both parts must be non-empty.
    pub fn split_at_year(&self, year: i32) -> Result<(Self, Self), StatError> {
        let cut = self.dates.partition_point(|date| date.year() < year);
        if cut == 0 {
            return Err(StatError::invalid_input(format!(
                "no observations before {year}; training part would be empty"
            )));
        }
        if cut == self.len() {
            return Err(StatError::invalid_input(format!(
                "no observations in or after {year}; held-out part would be empty"
            )));
        }
        Ok((
            Self {
                dates: self.dates[..cut].to_vec(),
                values: self.values[..cut].to_vec(),
            },
            Self {
                dates: self.dates[cut..].to_vec(),
                values: self.values[cut..].to_vec(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::DatedSeries;
    use chrono::{Days, NaiveDate};

    fn weekly(start: NaiveDate, values: &[f64]) -> DatedSeries {
        let dates = (0..values.len())
            .map(|i| {
                start
                    .checked_add_days(Days::new(7 * i as u64))
                    .expect("test dates should fit")
            })
            .collect();
        DatedSeries::new(dates, values.to_vec()).expect("test series should be valid")
    }

    #[test]
    fn new_rejects_length_mismatch_and_unsorted_dates() {
        let d0 = NaiveDate::from_ymd_opt(2021, 1, 3).expect("valid");
        let d1 = NaiveDate::from_ymd_opt(2021, 1, 10).expect("valid");

        let err = DatedSeries::new(vec![d0, d1], vec![1.0]).expect_err("mismatch should fail");
        assert!(err.to_string().contains("length mismatch"));

        let err =
            DatedSeries::new(vec![d1, d0], vec![1.0, 2.0]).expect_err("unsorted should fail");
        assert!(err.to_string().contains("strictly increasing"));

        let err = DatedSeries::new(vec![d0, d1], vec![1.0, f64::NAN])
            .expect_err("non-finite should fail");
        assert!(err.to_string().contains("finite"));

        assert!(DatedSeries::new(vec![], vec![]).is_err());
    }

    #[test]
    fn split_at_year_partitions_on_calendar_boundary() {
        let start = NaiveDate::from_ymd_opt(2022, 12, 18).expect("valid");
        let series = weekly(start, &[1.0, 2.0, 3.0, 4.0, 5.0]);
        let (train, test) = series.split_at_year(2023).expect("split should succeed");
        assert_eq!(train.values(), &[1.0, 2.0]);
        assert_eq!(test.values(), &[3.0, 4.0, 5.0]);
        assert_eq!(test.first_date(), NaiveDate::from_ymd_opt(2023, 1, 1).expect("valid"));
    }

    #[test]
    fn split_at_year_rejects_empty_sides() {
        let start = NaiveDate::from_ymd_opt(2022, 1, 2).expect("valid");
        let series = weekly(start, &[1.0, 2.0]);
        assert!(series.split_at_year(2022).is_err());
        assert!(series.split_at_year(2023).is_err());
    }
}
