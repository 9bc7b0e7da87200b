// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::model::ArimaFit;
use civstat_core::StatError;
use civstat_dist::{chi_squared_sf, students_t_two_sided_p};
use statrs::statistics::Statistics;

const DEFAULT_MAX_LAG: usize = 10;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ResidualConfig {
    pub alpha: f64,
    /// Ljung–Box lag; `None` uses `min(10, n / 5)`.
    pub lag: Option<usize>,
}

impl Default for ResidualConfig {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            lag: None,
        }
    }
}

/// Ljung–Box portmanteau statistic.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LjungBox {
    pub statistic: f64,
    pub lag: usize,
    pub df: usize,
    pub p_value: f64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ResidualDiagnostics {
    pub ljung_box: LjungBox,
    pub mean: f64,
    pub std_dev: f64,
    pub t_statistic: f64,
    pub t_p_value: f64,
    /// Ljung–Box does not reject uncorrelated residuals at `alpha`.
    pub independent: bool,
    /// The one-sample t-test does not reject a zero residual mean at `alpha`.
    pub centered: bool,
}

/// Ljung–Box test on `residuals` with `fitted_params` degrees of freedom
/// removed. The lag is raised to `fitted_params + 1` when needed so at least
/// one degree of freedom remains.
pub fn ljung_box(
    residuals: &[f64],
    lag: usize,
    fitted_params: usize,
) -> Result<LjungBox, StatError> {
    let n = residuals.len();
    let lag = lag.max(fitted_params + 1).max(1);
    if lag >= n {
        return Err(StatError::invalid_input(format!(
            "Ljung-Box lag {lag} must be below the residual count {n}"
        )));
    }

    let nf = n as f64;
    let mean = residuals.iter().sum::<f64>() / nf;
    let centered: Vec<f64> = residuals.iter().map(|e| e - mean).collect();
    let denom: f64 = centered.iter().map(|e| e * e).sum();
    if !(denom > 0.0) {
        return Err(StatError::numerical_issue(
            "Ljung-Box requires residuals with positive variance",
        ));
    }

    let statistic = nf
        * (nf + 2.0)
        * (1..=lag)
            .map(|k| {
                let r_k = centered[k..]
                    .iter()
                    .zip(&centered[..n - k])
                    .map(|(a, b)| a * b)
                    .sum::<f64>()
                    / denom;
                r_k * r_k / (nf - k as f64)
            })
            .sum::<f64>();
    let df = lag - fitted_params;
    let p_value = chi_squared_sf(statistic, df as f64)?;

    Ok(LjungBox {
        statistic,
        lag,
        df,
        p_value,
    })
}

/// Portmanteau and zero-mean checks on a fitted model's residuals.
pub fn diagnose_residuals(
    fit: &ArimaFit,
    config: &ResidualConfig,
) -> Result<ResidualDiagnostics, StatError> {
    if !(config.alpha > 0.0 && config.alpha < 1.0) {
        return Err(StatError::invalid_input(format!(
            "residual alpha must be in (0, 1), got {}",
            config.alpha
        )));
    }
    let residuals = &fit.residuals;
    let n = residuals.len();
    if n < 3 {
        return Err(StatError::invalid_input(format!(
            "residual diagnostics need at least 3 residuals, got {n}"
        )));
    }

    let lag = config
        .lag
        .unwrap_or_else(|| DEFAULT_MAX_LAG.min(n / 5));
    let ljung_box = ljung_box(residuals, lag, fit.order.p + fit.order.q)?;

    let nf = n as f64;
    let mean = Statistics::mean(residuals.iter());
    let std_dev = Statistics::std_dev(residuals.iter());
    let (t_statistic, t_p_value) = if std_dev > 0.0 {
        let t = mean / (std_dev / nf.sqrt());
        (t, students_t_two_sided_p(t, nf - 1.0)?)
    } else {
        (0.0, 1.0)
    };

    let independent = ljung_box.p_value >= config.alpha;
    let centered = t_p_value >= config.alpha;
    if !independent {
        tracing::warn!(
            order = %fit.order,
            p_value = ljung_box.p_value,
            "Ljung-Box rejects uncorrelated residuals"
        );
    }

    Ok(ResidualDiagnostics {
        ljung_box,
        mean,
        std_dev,
        t_statistic,
        t_p_value,
        independent,
        centered,
    })
}
