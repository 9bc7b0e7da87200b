// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Thin, validated wrappers over `statrs` continuous distributions.
//!
//! Every function maps the `statrs` construction error into
//! [`StatError::InvalidInput`] so callers propagate a single error type.

use civstat_core::StatError;
use statrs::distribution::{ChiSquared, ContinuousCDF, FisherSnedecor, Normal, StudentsT};
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

/// Standard normal CDF Φ(x).
pub fn standard_normal_cdf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    0.5 * erfc(-x / SQRT_2)
}

/// Standard normal quantile Φ⁻¹(p) for `p` in (0, 1).
pub fn standard_normal_quantile(p: f64) -> Result<f64, StatError> {
    validate_open_probability(p, "normal quantile")?;
    let normal = Normal::new(0.0, 1.0)
        .map_err(|err| StatError::invalid_input(format!("standard normal: {err}")))?;
    Ok(normal.inverse_cdf(p))
}

fn students_t(df: f64) -> Result<StudentsT, StatError> {
    if !(df.is_finite() && df > 0.0) {
        return Err(StatError::invalid_input(format!(
            "Student t requires finite df > 0, got {df}"
        )));
    }
    StudentsT::new(0.0, 1.0, df)
        .map_err(|err| StatError::invalid_input(format!("Student t(df={df}): {err}")))
}

pub fn students_t_cdf(t: f64, df: f64) -> Result<f64, StatError> {
    Ok(students_t(df)?.cdf(t))
}

/// Two-sided p-value `P(|T| >= |t|)`.
pub fn students_t_two_sided_p(t: f64, df: f64) -> Result<f64, StatError> {
    let dist = students_t(df)?;
    Ok((2.0 * dist.sf(t.abs())).clamp(0.0, 1.0))
}

pub fn students_t_quantile(p: f64, df: f64) -> Result<f64, StatError> {
    validate_open_probability(p, "t quantile")?;
    Ok(students_t(df)?.inverse_cdf(p))
}

/// Upper-tail probability of the F distribution.
pub fn f_sf(x: f64, df1: f64, df2: f64) -> Result<f64, StatError> {
    if !(df1.is_finite() && df1 > 0.0 && df2.is_finite() && df2 > 0.0) {
        return Err(StatError::invalid_input(format!(
            "F distribution requires finite df > 0, got df1={df1}, df2={df2}"
        )));
    }
    if x.is_nan() {
        return Err(StatError::numerical_issue("F statistic is NaN"));
    }
    if x <= 0.0 {
        return Ok(1.0);
    }
    if x == f64::INFINITY {
        return Ok(0.0);
    }
    let dist = FisherSnedecor::new(df1, df2)
        .map_err(|err| StatError::invalid_input(format!("F(df1={df1}, df2={df2}): {err}")))?;
    Ok(dist.sf(x).clamp(0.0, 1.0))
}

/// Upper-tail probability of the chi-squared distribution.
pub fn chi_squared_sf(x: f64, df: f64) -> Result<f64, StatError> {
    if !(df.is_finite() && df > 0.0) {
        return Err(StatError::invalid_input(format!(
            "chi-squared requires finite df > 0, got {df}"
        )));
    }
    if x.is_nan() {
        return Err(StatError::numerical_issue("chi-squared statistic is NaN"));
    }
    if x <= 0.0 {
        return Ok(1.0);
    }
    let dist = ChiSquared::new(df)
        .map_err(|err| StatError::invalid_input(format!("chi-squared(df={df}): {err}")))?;
    Ok(dist.sf(x).clamp(0.0, 1.0))
}

fn validate_open_probability(p: f64, context: &str) -> Result<(), StatError> {
    if !(p > 0.0 && p < 1.0) {
        return Err(StatError::invalid_input(format!(
            "{context} requires p in (0, 1), got {p}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual} (tol={tol})"
        );
    }

    #[test]
    fn normal_cdf_and_quantile_known_values() {
        assert_close(standard_normal_cdf(0.0), 0.5, 1e-12);
        assert_close(standard_normal_cdf(1.959_963_984_540_054), 0.975, 1e-9);
        assert_close(
            standard_normal_quantile(0.975).expect("valid p"),
            1.959_963_984_540_054,
            1e-6,
        );
        assert_close(
            standard_normal_quantile(0.9).expect("valid p"),
            1.281_551_565_544_6,
            1e-6,
        );
        assert!(standard_normal_quantile(1.0).is_err());
    }

    #[test]
    fn t_two_sided_p_matches_reference() {
        // qt(0.975, 10) = 2.228139
        assert_close(students_t_two_sided_p(2.228_139, 10.0).expect("valid"), 0.05, 1e-5);
        assert_close(students_t_two_sided_p(0.0, 5.0).expect("valid"), 1.0, 1e-12);
        assert!(students_t_cdf(1.0, 0.0).is_err());
    }

    #[test]
    fn f_and_chi_squared_tails_match_reference() {
        // qf(0.95, 4, 20) = 2.866081
        assert_close(f_sf(2.866_081, 4.0, 20.0).expect("valid"), 0.05, 1e-5);
        // qchisq(0.95, 3) = 7.814728
        assert_close(chi_squared_sf(7.814_728, 3.0).expect("valid"), 0.05, 1e-5);
        assert_eq!(f_sf(0.0, 1.0, 1.0).expect("valid"), 1.0);
        assert_eq!(chi_squared_sf(-1.0, 2.0).expect("valid"), 1.0);
        assert!(f_sf(f64::NAN, 2.0, 3.0).is_err());
    }
}
