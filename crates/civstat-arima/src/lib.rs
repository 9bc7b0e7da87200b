// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod backtest;
pub mod diff;
pub mod forecast;
mod linalg;
pub mod model;
mod optimize;
mod params;
pub mod residuals;
pub mod search;
pub mod stationarity;

pub use backtest::{Backtest, IntervalCoverage, backtest};
pub use diff::{difference, difference_n, integrate};
pub use forecast::{Forecast, PredictionInterval, forecast};
pub use model::{ArimaFit, ArimaOrder, Criterion, FitConfig, fit_arima};
pub use residuals::{LjungBox, ResidualConfig, ResidualDiagnostics, diagnose_residuals, ljung_box};
pub use search::{CandidateScore, OrderSearchConfig, OrderSearchOutcome, SearchStrategy, search_orders};
pub use stationarity::{
    AdfTest, KpssTest, StationarityConfig, StationarityStep, StationarityTest, Stationarization,
    adf_test, kpss_test, stationarize,
};

/// Time-series modelling namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = (civstat_core::crate_name(), civstat_dist::crate_name());
    "civstat-arima"
}
