// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Conditional-sum-of-squares ARIMA estimation.

use crate::diff::difference_n;
use crate::optimize::{NelderMeadConfig, nelder_mead};
use crate::params::{to_invertible, to_stationary};
use civstat_core::StatError;
use std::f64::consts::PI;
use std::fmt;

/// Residual variance floor; keeps the log-likelihood finite on exact fits.
const VAR_FLOOR: f64 = 1e-12;
const MAX_AR_ORDER: usize = 12;
const MAX_MA_ORDER: usize = 12;
const MAX_DIFFERENCING: usize = 3;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArimaOrder {
    pub p: usize,
    pub d: usize,
    pub q: usize,
}

impl ArimaOrder {
    pub const fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    pub fn includes_mean(self) -> bool {
        self.d == 0
    }
}

impl fmt::Display for ArimaOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ARIMA({},{},{})", self.p, self.d, self.q)
    }
}

/// Information criterion used to rank candidate models.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Criterion {
    #[default]
    Aic,
    Aicc,
    Bic,
}

impl Criterion {
    pub fn label(self) -> &'static str {
        match self {
            Self::Aic => "aic",
            Self::Aicc => "aicc",
            Self::Bic => "bic",
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitConfig {
    pub max_iterations: usize,
    pub tolerance: f64,
    /// Leading observations of the undifferenced series whose one-step
    /// errors are left out of the sum of squares. Must be at least `d + p`;
    /// `None` uses exactly `d + p`. Fits scored on the same value are
    /// comparable by information criterion.
    pub condition_on: Option<usize>,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1_000,
            tolerance: 1e-8,
            condition_on: None,
        }
    }
}

impl FitConfig {
    fn validate(&self) -> Result<(), StatError> {
        if self.max_iterations == 0 {
            return Err(StatError::invalid_input("fit max_iterations must be >= 1"));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(StatError::invalid_input(format!(
                "fit tolerance must be finite and > 0, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// A fitted ARIMA model.
///
/// `ar` holds `φ` of `1 − Σ φ_j Bʲ`; `ma` holds `θ` of `1 + Σ θ_j Bʲ`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ArimaFit {
    pub order: ArimaOrder,
    pub ar: Vec<f64>,
    pub ma: Vec<f64>,
    /// Mean of the series; only estimated when `d == 0`.
    pub mean: Option<f64>,
    pub sigma2: f64,
    pub loglik: f64,
    pub aic: f64,
    pub aicc: f64,
    pub bic: f64,
    /// Observations contributing to the conditional sum of squares.
    pub n_used: usize,
    /// Estimated parameters including `σ²`.
    pub n_params: usize,
    /// One-step residuals for the `n_used` conditioned observations.
    pub residuals: Vec<f64>,
    pub converged: bool,
    pub iterations: usize,
    #[cfg_attr(feature = "serde", serde(skip))]
    series: Vec<f64>,
}

impl ArimaFit {
    pub fn criterion(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Aic => self.aic,
            Criterion::Aicc => self.aicc,
            Criterion::Bic => self.bic,
        }
    }

    /// The undifferenced series the model was fitted to.
    pub fn series(&self) -> &[f64] {
        &self.series
    }
}

/// Fits ARIMA(p, d, q) by conditional sum of squares.
///
/// The sum runs over observations after [`FitConfig::condition_on`], so the
/// log-likelihood and criteria cover `n_used = x.len() - condition_on`
/// observations.
///
/// The differenced series is scaled to unit standard deviation before
/// optimization; reported coefficients, mean and `σ²` are on the original
/// scale.
pub fn fit_arima(x: &[f64], order: ArimaOrder, config: &FitConfig) -> Result<ArimaFit, StatError> {
    config.validate()?;
    if order.p > MAX_AR_ORDER || order.q > MAX_MA_ORDER || order.d > MAX_DIFFERENCING {
        return Err(StatError::resource_limit(format!(
            "{order} exceeds supported bounds p <= {MAX_AR_ORDER}, d <= {MAX_DIFFERENCING}, q <= {MAX_MA_ORDER}"
        )));
    }
    if let Some(idx) = x.iter().position(|v| !v.is_finite()) {
        return Err(StatError::invalid_input(format!(
            "ARIMA input index {idx} is not finite: {}",
            x[idx]
        )));
    }

    let skip = match config.condition_on {
        Some(skip) if skip < order.d + order.p => {
            return Err(StatError::invalid_input(format!(
                "{order} cannot condition on {skip} observations; needs at least {}",
                order.d + order.p
            )));
        }
        Some(skip) => skip,
        None => order.d + order.p,
    };

    let include_mean = order.includes_mean();
    let n_params = order.p + order.q + usize::from(include_mean) + 1;
    let min_len = skip + n_params + 1;
    if x.len() < min_len {
        return Err(StatError::invalid_input(format!(
            "{order} needs at least {min_len} observations, got {}",
            x.len()
        )));
    }

    let w = difference_n(x, order.d)?;
    let scale = sample_sd(&w);
    let scale = if scale > 0.0 { scale } else { 1.0 };
    let z: Vec<f64> = w.iter().map(|v| v / scale).collect();
    // Residuals start at index p of `z`; the first `burn_in` of them only
    // seed the MA recursion.
    let burn_in = skip - order.d - order.p;
    let n_used = z.len() - order.p - burn_in;

    let mut start = vec![0.0; order.p + order.q];
    if include_mean {
        start.push(z.iter().sum::<f64>() / z.len() as f64);
    }

    let unpack = |params: &[f64]| -> (Vec<f64>, Vec<f64>, f64) {
        let ar = to_stationary(&params[..order.p]);
        let ma = to_invertible(&params[order.p..order.p + order.q]);
        let mean = if include_mean {
            params[order.p + order.q]
        } else {
            0.0
        };
        (ar, ma, mean)
    };

    let nm_config = NelderMeadConfig {
        max_iterations: config.max_iterations,
        tolerance: config.tolerance,
        initial_step: 0.5,
    };
    let result = nelder_mead(
        |params| {
            let (ar, ma, mean) = unpack(params);
            let residuals = css_residuals(&z, &ar, &ma, mean);
            let sse: f64 = residuals[burn_in..].iter().map(|e| e * e).sum();
            0.5 * (sse / n_used as f64).ln()
        },
        &start,
        &nm_config,
    );
    if !result.value.is_finite() {
        return Err(StatError::numerical_issue(format!(
            "{order} conditional sum of squares did not evaluate to a finite value"
        )));
    }

    let (ar, ma, scaled_mean) = unpack(&result.point);
    let residuals: Vec<f64> = css_residuals(&z, &ar, &ma, scaled_mean)
        .into_iter()
        .skip(burn_in)
        .map(|e| e * scale)
        .collect();
    let sse: f64 = residuals.iter().map(|e| e * e).sum();
    let sigma2 = (sse / n_used as f64).max(VAR_FLOOR);

    let nf = n_used as f64;
    let kf = n_params as f64;
    let loglik = -0.5 * nf * ((2.0 * PI * sigma2).ln() + 1.0);
    let aic = -2.0 * loglik + 2.0 * kf;
    let aicc = if nf - kf - 1.0 > 0.0 {
        aic + 2.0 * kf * (kf + 1.0) / (nf - kf - 1.0)
    } else {
        f64::INFINITY
    };
    let bic = -2.0 * loglik + kf * nf.ln();

    if !result.converged {
        tracing::debug!(%order, iterations = result.iterations, "CSS optimizer hit iteration cap");
    }
    tracing::debug!(%order, sigma2, aic, bic, "fitted ARIMA");

    Ok(ArimaFit {
        order,
        ar,
        ma,
        mean: include_mean.then_some(scaled_mean * scale),
        sigma2,
        loglik,
        aic,
        aicc,
        bic,
        n_used,
        n_params,
        residuals,
        converged: result.converged,
        iterations: result.iterations,
        series: x.to_vec(),
    })
}

/// One-step CSS residuals for `t >= p`, with pre-sample errors set to zero.
pub(crate) fn css_residuals(w: &[f64], ar: &[f64], ma: &[f64], mean: f64) -> Vec<f64> {
    let p = ar.len();
    let mut residuals = vec![0.0; w.len()];
    for t in p..w.len() {
        let mut e = w[t] - mean;
        for (j, phi) in ar.iter().enumerate() {
            e -= phi * (w[t - j - 1] - mean);
        }
        for (j, theta) in ma.iter().enumerate() {
            if t >= p + j + 1 {
                e -= theta * residuals[t - j - 1];
            }
        }
        residuals[t] = e;
    }
    residuals.split_off(p)
}

fn sample_sd(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
}
