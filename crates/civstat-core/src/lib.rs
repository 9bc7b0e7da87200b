// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod calendar;
pub mod diagnostics;
pub mod error;
pub mod time_series;

pub use calendar::{YearMonth, week_ending};
pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, DataCorrection, Diagnostics};
pub use error::StatError;
pub use time_series::DatedSeries;

/// Core shared types and helpers for civstat.
pub fn crate_name() -> &'static str {
    "civstat-core"
}
