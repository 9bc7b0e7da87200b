// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Reader for the JHU CSSE global Covid-19 time-series tables.
//!
//! The tables are wide: one row per (province, country) and one column per
//! day holding the cumulative count. Province rows are summed per country.

use crate::error::IngestError;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::io::Read;

const COL_PROVINCE: &str = "Province/State";
const COL_COUNTRY: &str = "Country/Region";
const DATE_FORMAT: &str = "%m/%d/%y";

/// Cumulative counts for one country, one value per day.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct CountrySeries {
    pub country: String,
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DailyCumulative {
    pub date: NaiveDate,
    pub cases: f64,
    pub deaths: f64,
}

/// Reads the cumulative series of `country`, summing any province rows.
pub fn read_jhu_global<R: Read>(reader: R, country: &str) -> Result<CountrySeries, IngestError> {
    let mut csv = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let headers = csv.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| IngestError::parse(0, format!("missing required column {name}")))
    };
    let country_col = position(COL_COUNTRY)?;
    let _ = position(COL_PROVINCE)?;

    // Date columns are every header that parses as M/D/YY.
    let date_columns: Vec<(usize, NaiveDate)> = headers
        .iter()
        .enumerate()
        .filter_map(|(idx, h)| {
            NaiveDate::parse_from_str(h.trim(), DATE_FORMAT)
                .ok()
                .map(|date| (idx, date))
        })
        .collect();
    if date_columns.is_empty() {
        return Err(IngestError::parse(0, "no date columns in header"));
    }
    if let Some(pair) = date_columns.windows(2).find(|pair| pair[0].1 >= pair[1].1) {
        return Err(IngestError::parse(
            0,
            format!("date columns out of order at {}", pair[1].1),
        ));
    }

    let mut totals = vec![0.0; date_columns.len()];
    let mut matched = 0usize;
    for (idx, record) in csv.records().enumerate() {
        let record = record?;
        if record.get(country_col).map(str::trim) != Some(country) {
            continue;
        }
        matched += 1;
        for (slot, (col, date)) in totals.iter_mut().zip(&date_columns) {
            let raw = record.get(*col).map(str::trim).unwrap_or("");
            let value = raw.parse::<f64>().ok().filter(|v| v.is_finite()).ok_or_else(|| {
                IngestError::parse(
                    idx as u64 + 1,
                    format!("invalid count '{raw}' for {country} on {date}"),
                )
            })?;
            *slot += value;
        }
    }

    if matched == 0 {
        return Err(IngestError::parse(
            0,
            format!("country '{country}' not found"),
        ));
    }
    tracing::info!(
        country,
        rows = matched,
        days = totals.len(),
        "read JHU cumulative series"
    );

    Ok(CountrySeries {
        country: country.to_string(),
        dates: date_columns.into_iter().map(|(_, date)| date).collect(),
        values: totals,
    })
}

/// Joins cumulative deaths and confirmed cases on date. The two tables must
/// cover the same days.
pub fn combine_cumulative(
    deaths: &CountrySeries,
    confirmed: &CountrySeries,
) -> Result<Vec<DailyCumulative>, IngestError> {
    if deaths.dates != confirmed.dates {
        return Err(IngestError::parse(
            0,
            format!(
                "deaths ({} days) and confirmed ({} days) tables cover different dates",
                deaths.dates.len(),
                confirmed.dates.len()
            ),
        ));
    }
    Ok(deaths
        .dates
        .iter()
        .zip(deaths.values.iter().zip(&confirmed.values))
        .map(|(date, (d, c))| DailyCumulative {
            date: *date,
            cases: *c,
            deaths: *d,
        })
        .collect())
}
