// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use civstat_core::StatError;
use statrs::statistics::Statistics;

/// Descriptive summary of one group; the box-plot five numbers plus moments.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct GroupSummary {
    pub label: String,
    pub n: usize,
    pub mean: f64,
    /// Sample standard deviation (n − 1 denominator).
    pub std_dev: f64,
    pub variance: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Summarizes a labelled sample. `n == 1` yields zero variance.
pub fn summarize(label: impl Into<String>, samples: &[f64]) -> Result<GroupSummary, StatError> {
    let label = label.into();
    if samples.is_empty() {
        return Err(StatError::invalid_input(format!(
            "cannot summarize empty group '{label}'"
        )));
    }
    if let Some(idx) = samples.iter().position(|v| !v.is_finite()) {
        return Err(StatError::invalid_input(format!(
            "group '{label}' index {idx} is not finite: {}",
            samples[idx]
        )));
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let n = samples.len();
    let mean = Statistics::mean(samples.iter());
    let variance = if n > 1 {
        Statistics::variance(samples.iter())
    } else {
        0.0
    };

    Ok(GroupSummary {
        label,
        n,
        mean,
        std_dev: variance.sqrt(),
        variance,
        min: sorted[0],
        q1: quantile_sorted(&sorted, 0.25),
        median: quantile_sorted(&sorted, 0.5),
        q3: quantile_sorted(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

/// Hyndman–Fan type 7 quantile (linear interpolation between order
/// statistics at `(n − 1)·p`).
pub fn quantile_type7(samples: &[f64], p: f64) -> Result<f64, StatError> {
    if samples.is_empty() {
        return Err(StatError::invalid_input("quantile of an empty sample"));
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(StatError::invalid_input(format!(
            "quantile probability must be in [0, 1], got {p}"
        )));
    }
    if samples.iter().any(|v| v.is_nan()) {
        return Err(StatError::invalid_input("quantile input contains NaN"));
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(quantile_sorted(&sorted, p))
}

fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let h = (sorted.len() - 1) as f64 * p;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::{quantile_type7, summarize};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual} (tol={tol})"
        );
    }

    #[test]
    fn summarize_matches_r_summary() {
        // summary(c(7, 1, 3, 9, 4, 10)); sd = 3.559026
        let summary = summarize("x", &[7.0, 1.0, 3.0, 9.0, 4.0, 10.0]).expect("valid sample");
        assert_eq!(summary.n, 6);
        assert_close(summary.mean, 34.0 / 6.0, 1e-12);
        assert_close(summary.min, 1.0, 0.0);
        assert_close(summary.q1, 3.25, 1e-12);
        assert_close(summary.median, 5.5, 1e-12);
        assert_close(summary.q3, 8.5, 1e-12);
        assert_close(summary.max, 10.0, 0.0);
        assert_close(summary.std_dev, 3.559_026, 1e-5);
        assert_close(summary.variance, summary.std_dev * summary.std_dev, 1e-12);
    }

    #[test]
    fn summarize_single_value_has_zero_spread() {
        let summary = summarize("one", &[4.0]).expect("single value is valid");
        assert_eq!(summary.variance, 0.0);
        assert_eq!(summary.q1, 4.0);
        assert_eq!(summary.q3, 4.0);
    }

    #[test]
    fn summarize_rejects_empty_and_non_finite() {
        assert!(summarize("empty", &[]).is_err());
        assert!(summarize("nan", &[1.0, f64::NAN]).is_err());
    }

    #[test]
    fn quantile_type7_interpolates_between_order_statistics() {
        let xs = [10.0, 20.0, 30.0, 40.0];
        assert_close(quantile_type7(&xs, 0.0).expect("valid"), 10.0, 0.0);
        assert_close(quantile_type7(&xs, 1.0).expect("valid"), 40.0, 0.0);
        assert_close(quantile_type7(&xs, 0.5).expect("valid"), 25.0, 1e-12);
        assert_close(quantile_type7(&xs, 0.1).expect("valid"), 13.0, 1e-12);
        assert!(quantile_type7(&xs, 1.5).is_err());
        assert!(quantile_type7(&[], 0.5).is_err());
    }
}
