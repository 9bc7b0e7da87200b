// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

pub mod continuous;
pub mod studentized_range;

pub use continuous::{
    chi_squared_sf, f_sf, standard_normal_cdf, standard_normal_quantile, students_t_cdf,
    students_t_quantile, students_t_two_sided_p,
};
pub use studentized_range::StudentizedRange;

/// Distribution namespace placeholder.
pub fn crate_name() -> &'static str {
    let _ = civstat_core::crate_name();
    "civstat-dist"
}
