// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod charts;
pub mod config;
pub mod covid;
pub mod error;
pub mod render;
pub mod shootings;

pub use config::{CovidConfig, PipelineConfig, ShootingsConfig};
pub use covid::{CovidReport, DailyNew, WeeklyTotal};
pub use error::PipelineError;
pub use render::{Render, ReportFormat, render};
pub use shootings::{Incident, MonthlyRate, MonthlyRateTable, ShootingsReport};

use civstat_ingest::{
    BoroughPopulation, combine_cumulative, read_country_population, read_incidents,
    read_jhu_global,
};

/// Fetches the incident export and compares borough rates.
pub fn run_shootings(config: &ShootingsConfig) -> Result<ShootingsReport, PipelineError> {
    config.validate()?;
    tracing::info!(source = %config.source, "loading shooting incidents");
    let raw = config.source.fetch()?;
    let rows = read_incidents(raw.as_slice())?;
    shootings::analyze(rows, &BoroughPopulation::census_2020(), config)
}

/// Fetches the cumulative tables and population lookup, then forecasts
/// weekly deaths.
pub fn run_covid(config: &CovidConfig) -> Result<CovidReport, PipelineError> {
    config.validate()?;
    let country = config.country.as_str();
    tracing::info!(source = %config.deaths, country, "loading cumulative deaths");
    let deaths = read_jhu_global(config.deaths.fetch()?.as_slice(), country)?;
    tracing::info!(source = %config.confirmed, country, "loading cumulative cases");
    let confirmed = read_jhu_global(config.confirmed.fetch()?.as_slice(), country)?;
    tracing::info!(source = %config.lookup, country, "loading population");
    let population = read_country_population(config.lookup.fetch()?.as_slice(), country)?;

    let cumulative = combine_cumulative(&deaths, &confirmed)?;
    covid::analyze(&cumulative, population, config)
}

pub fn crate_name() -> &'static str {
    let _ = (
        civstat_core::crate_name(),
        civstat_anova::crate_name(),
        civstat_arima::crate_name(),
        civstat_ingest::crate_name(),
    );
    "civstat-pipeline"
}
