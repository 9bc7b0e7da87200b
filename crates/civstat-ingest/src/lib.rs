// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod covid;
pub mod error;
pub mod population;
pub mod shootings;
pub mod source;

pub use covid::{CountrySeries, DailyCumulative, combine_cumulative, read_jhu_global};
pub use error::IngestError;
pub use population::{BoroughPopulation, read_country_population};
pub use shootings::{Borough, IncidentRow, VictimDemographics, read_incidents};
pub use source::DataSource;

/// Ingestion namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = civstat_core::crate_name();
    "civstat-ingest"
}
