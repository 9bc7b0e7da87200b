// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Run configuration for both analyses.
//!
//! Every field has a default, so a config file only needs to name what it
//! changes. `PipelineConfig::default()` is what `civstat config` prints.

use crate::error::PipelineError;
use chrono::{Datelike, NaiveDate, Weekday};
use civstat_arima::{OrderSearchConfig, ResidualConfig, StationarityConfig};
use civstat_core::StatError;
use civstat_ingest::DataSource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const NYPD_SHOOTINGS_URL: &str =
    "https://data.cityofnewyork.us/api/views/833y-fsy8/rows.csv?accessType=DOWNLOAD";
pub const JHU_DEATHS_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_deaths_global.csv";
pub const JHU_CONFIRMED_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/csse_covid_19_time_series/time_series_covid19_confirmed_global.csv";
pub const JHU_LOOKUP_URL: &str = "https://raw.githubusercontent.com/CSSEGISandData/COVID-19/master/csse_covid_19_data/UID_ISO_FIPS_LookUp_Table.csv";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PipelineConfig {
    pub shootings: ShootingsConfig,
    pub covid: CovidConfig,
}

impl PipelineConfig {
    /// Reads a JSON config file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let raw = fs::read_to_string(path).map_err(|err| PipelineError::io(path, err))?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), StatError> {
        self.shootings.validate()?;
        self.covid.validate()
    }

    pub fn to_json_pretty(&self) -> Result<String, PipelineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShootingsConfig {
    pub source: DataSource,
    /// Significance level for the omnibus tests.
    pub alpha: f64,
    /// Family-wise confidence for Tukey HSD intervals.
    pub confidence: f64,
}

impl Default for ShootingsConfig {
    fn default() -> Self {
        Self {
            source: DataSource::Url(NYPD_SHOOTINGS_URL.to_string()),
            alpha: 0.05,
            confidence: 0.95,
        }
    }
}

impl ShootingsConfig {
    pub fn validate(&self) -> Result<(), StatError> {
        check_unit_interval("shootings.alpha", self.alpha)?;
        check_unit_interval("shootings.confidence", self.confidence)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CovidConfig {
    pub deaths: DataSource,
    pub confirmed: DataSource,
    pub lookup: DataSource,
    pub country: String,
    pub week_end: Weekday,
    /// Week-ending dates whose deaths were reported with the following week.
    pub missing_weeks: Vec<NaiveDate>,
    /// First held-out calendar year; `None` uses the year of the last week.
    pub split_year: Option<i32>,
    pub stationarity: StationarityConfig,
    pub search: OrderSearchConfig,
    pub residuals: ResidualConfig,
    pub levels: Vec<f64>,
    /// Forecast horizon in weeks; `None` forecasts the whole held-out part.
    pub horizon: Option<usize>,
}

impl Default for CovidConfig {
    fn default() -> Self {
        Self {
            deaths: DataSource::Url(JHU_DEATHS_URL.to_string()),
            confirmed: DataSource::Url(JHU_CONFIRMED_URL.to_string()),
            lookup: DataSource::Url(JHU_LOOKUP_URL.to_string()),
            country: "Ireland".to_string(),
            week_end: Weekday::Sun,
            missing_weeks: vec![],
            split_year: None,
            stationarity: StationarityConfig::default(),
            search: OrderSearchConfig::default(),
            residuals: ResidualConfig::default(),
            levels: vec![0.8, 0.95],
            horizon: None,
        }
    }
}

impl CovidConfig {
    pub fn validate(&self) -> Result<(), StatError> {
        if self.country.trim().is_empty() {
            return Err(StatError::invalid_input("covid.country must not be empty"));
        }
        if let Some(date) = self
            .missing_weeks
            .iter()
            .find(|date| date.weekday() != self.week_end)
        {
            return Err(StatError::invalid_input(format!(
                "covid.missing_weeks entry {date} does not fall on {}",
                self.week_end
            )));
        }
        check_unit_interval("covid.stationarity.alpha", self.stationarity.alpha)?;
        check_unit_interval("covid.residuals.alpha", self.residuals.alpha)?;
        for level in &self.levels {
            check_unit_interval("covid.levels", *level)?;
        }
        if self.horizon == Some(0) {
            return Err(StatError::invalid_input("covid.horizon must be >= 1"));
        }
        Ok(())
    }
}

fn check_unit_interval(field: &str, value: f64) -> Result<(), StatError> {
    if value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(StatError::invalid_input(format!(
            "{field} must be in (0, 1), got {value}"
        )))
    }
}
