// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod descriptive;
pub mod group;
pub mod oneway;
pub mod tukey;
pub mod welch;

pub use descriptive::{GroupSummary, quantile_type7, summarize};
pub use group::SampleGroup;
pub use oneway::{OneWayAnova, one_way_anova};
pub use tukey::{PairwiseComparison, TukeyHsd, tukey_hsd};
pub use welch::{WelchAnova, welch_anova};

/// Group comparison namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = (civstat_core::crate_name(), civstat_dist::crate_name());
    "civstat-anova"
}
