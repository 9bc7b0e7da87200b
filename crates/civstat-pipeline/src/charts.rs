// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Plot-ready data embedded in reports. Rendering is left to the consumer.

use crate::covid::DailyNew;
use crate::shootings::MonthlyRateTable;
use chrono::{Datelike, NaiveDate};
use civstat_anova::GroupSummary;
use civstat_arima::Forecast;
use civstat_core::YearMonth;
use civstat_ingest::Borough;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatePoint {
    pub month: YearMonth,
    pub rate_per_million: f64,
}

/// Monthly rate line for one borough.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RateLine {
    pub borough: Borough,
    pub points: Vec<RatePoint>,
}

/// Five-number summary for a box plot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoxPlot {
    pub label: String,
    pub n: usize,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// One day of a calendar heatmap keyed by ISO week.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub iso_year: i32,
    pub iso_week: u32,
    /// 1 = Monday through 7 = Sunday.
    pub weekday: u32,
    pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FanBand {
    pub level: f64,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

/// Point forecast with interval bands and whatever actuals overlap it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastFan {
    pub dates: Vec<NaiveDate>,
    pub mean: Vec<f64>,
    pub bands: Vec<FanBand>,
    /// Held-out observations for the leading `actual.len()` dates.
    pub actual: Vec<f64>,
}

pub fn rate_lines(table: &MonthlyRateTable) -> Vec<RateLine> {
    Borough::ALL
        .iter()
        .map(|&borough| RateLine {
            borough,
            points: table
                .months()
                .iter()
                .filter_map(|month| {
                    table.get(borough, *month).map(|rate| RatePoint {
                        month: *month,
                        rate_per_million: rate.rate_per_million,
                    })
                })
                .collect(),
        })
        .collect()
}

pub fn box_plots(summaries: &[GroupSummary]) -> Vec<BoxPlot> {
    summaries
        .iter()
        .map(|summary| BoxPlot {
            label: summary.label.clone(),
            n: summary.n,
            min: summary.min,
            q1: summary.q1,
            median: summary.median,
            q3: summary.q3,
            max: summary.max,
        })
        .collect()
}

/// Daily new deaths laid out by ISO year, ISO week and weekday.
pub fn calendar_heatmap(daily: &[DailyNew]) -> Vec<HeatmapCell> {
    daily
        .iter()
        .map(|day| {
            let iso = day.date.iso_week();
            HeatmapCell {
                iso_year: iso.year(),
                iso_week: iso.week(),
                weekday: day.date.weekday().number_from_monday(),
                value: day.deaths,
            }
        })
        .collect()
}

pub fn forecast_fan(dates: Vec<NaiveDate>, forecast: &Forecast, actual: &[f64]) -> ForecastFan {
    ForecastFan {
        dates,
        mean: forecast.mean.clone(),
        bands: forecast
            .intervals
            .iter()
            .map(|interval| FanBand {
                level: interval.level,
                lower: interval.lower.clone(),
                upper: interval.upper.clone(),
            })
            .collect(),
        actual: actual.iter().copied().take(forecast.horizon).collect(),
    }
}
