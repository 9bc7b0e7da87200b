// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Stationarity tests and the differencing loop that drives ARIMA `d`.
//!
//! KPSS takes stationarity as the null hypothesis; ADF takes a unit root as
//! the null. Both report p-values interpolated from published tables, so they
//! are clamped to the table range.

use crate::diff::difference;
use crate::linalg::ols;
use civstat_core::StatError;

const KPSS_LEVEL_CRITICAL: [f64; 4] = [0.347, 0.463, 0.574, 0.739];
const KPSS_LEVEL_P: [f64; 4] = [0.10, 0.05, 0.025, 0.01];

/// Sample sizes of the Banerjee et al. (1993) ADF table.
const ADF_SIZES: [f64; 6] = [25.0, 50.0, 100.0, 250.0, 500.0, 100_000.0];
const ADF_P: [f64; 8] = [0.01, 0.025, 0.05, 0.10, 0.90, 0.95, 0.975, 0.99];
/// Critical values with constant and trend; one row per entry of `ADF_P`.
const ADF_CRITICAL: [[f64; 6]; 8] = [
    [-4.38, -4.15, -4.04, -3.99, -3.98, -3.96],
    [-3.95, -3.80, -3.73, -3.69, -3.68, -3.66],
    [-3.60, -3.50, -3.45, -3.43, -3.42, -3.41],
    [-3.24, -3.18, -3.15, -3.13, -3.13, -3.12],
    [-1.14, -1.19, -1.22, -1.23, -1.24, -1.25],
    [-0.80, -0.87, -0.90, -0.92, -0.93, -0.94],
    [-0.50, -0.58, -0.62, -0.64, -0.65, -0.66],
    [-0.15, -0.24, -0.28, -0.31, -0.32, -0.33],
];

const KPSS_MIN_LEN: usize = 4;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum StationarityTest {
    #[default]
    Kpss,
    Adf,
}

impl StationarityTest {
    pub fn label(self) -> &'static str {
        match self {
            Self::Kpss => "kpss",
            Self::Adf => "adf",
        }
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KpssTest {
    pub statistic: f64,
    pub lags: usize,
    pub p_value: f64,
}

impl KpssTest {
    pub fn is_stationary(&self, alpha: f64) -> bool {
        self.p_value >= alpha
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdfTest {
    pub statistic: f64,
    pub lags: usize,
    pub p_value: f64,
}

impl AdfTest {
    pub fn is_stationary(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// KPSS level-stationarity test with a Bartlett-weighted long-run variance.
///
/// `lags = None` uses `trunc(4 · (n / 100)^¼)`.
pub fn kpss_test(x: &[f64], lags: Option<usize>) -> Result<KpssTest, StatError> {
    let n = x.len();
    if n < KPSS_MIN_LEN {
        return Err(StatError::invalid_input(format!(
            "KPSS requires at least {KPSS_MIN_LEN} observations, got {n}"
        )));
    }
    validate_finite(x, "KPSS")?;

    let nf = n as f64;
    let lags = lags.unwrap_or_else(|| (4.0 * (nf / 100.0).powf(0.25)).trunc() as usize);
    if lags >= n {
        return Err(StatError::invalid_input(format!(
            "KPSS lag truncation {lags} must be below series length {n}"
        )));
    }

    let mean = x.iter().sum::<f64>() / nf;
    let residuals: Vec<f64> = x.iter().map(|v| v - mean).collect();

    let mut partial = 0.0;
    let eta = residuals
        .iter()
        .map(|e| {
            partial += e;
            partial * partial
        })
        .sum::<f64>()
        / (nf * nf);

    let mut long_run = residuals.iter().map(|e| e * e).sum::<f64>() / nf;
    for s in 1..=lags {
        let weight = 1.0 - s as f64 / (lags as f64 + 1.0);
        let autocov = residuals[s..]
            .iter()
            .zip(&residuals[..n - s])
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / nf;
        long_run += 2.0 * weight * autocov;
    }

    // A constant series has no fluctuation to accumulate.
    let statistic = if long_run > f64::EPSILON {
        eta / long_run
    } else {
        0.0
    };
    let p_value = interpolate_clamped(&KPSS_LEVEL_CRITICAL, &KPSS_LEVEL_P, statistic);

    Ok(KpssTest {
        statistic,
        lags,
        p_value,
    })
}

/// Augmented Dickey–Fuller test with constant and linear trend.
///
/// `k = None` uses `trunc((n − 1)^⅓)` lagged differences.
pub fn adf_test(x: &[f64], k: Option<usize>) -> Result<AdfTest, StatError> {
    validate_finite(x, "ADF")?;
    let lags = k.unwrap_or_else(|| ((x.len().saturating_sub(1)) as f64).cbrt().trunc() as usize);
    let width = lags + 1;

    // Each regression row needs the level plus `lags` lagged differences,
    // and the regression needs more rows than its 3 + lags columns.
    if x.len() < width + lags + 5 {
        return Err(StatError::invalid_input(format!(
            "ADF with {lags} lags requires at least {} observations, got {}",
            width + lags + 5,
            x.len()
        )));
    }

    let y = difference(x, 1)?;
    let n = y.len();
    let mut rows = Vec::with_capacity(n + 1 - width);
    let mut response = Vec::with_capacity(n + 1 - width);
    for i in (width - 1)..n {
        let mut row = Vec::with_capacity(3 + lags);
        row.push(x[i]);
        row.push(1.0);
        row.push((i + 1) as f64);
        for lag in 1..width {
            row.push(y[i - lag]);
        }
        rows.push(row);
        response.push(y[i]);
    }

    let fit = ols(&rows, &response)?;
    if !(fit.std_errors[0] > 0.0) {
        return Err(StatError::numerical_issue(
            "ADF regression has a perfect fit; the statistic is undefined",
        ));
    }
    let statistic = fit.coefficients[0] / fit.std_errors[0];

    let sample_size = n as f64;
    let critical: Vec<f64> = ADF_CRITICAL
        .iter()
        .map(|row| interpolate_clamped(&ADF_SIZES, row, sample_size))
        .collect();
    let p_value = interpolate_clamped(&critical, &ADF_P, statistic);

    Ok(AdfTest {
        statistic,
        lags,
        p_value,
    })
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StationarityConfig {
    pub test: StationarityTest,
    pub alpha: f64,
    pub max_d: usize,
}

impl Default for StationarityConfig {
    fn default() -> Self {
        Self {
            test: StationarityTest::Kpss,
            alpha: 0.05,
            max_d: 2,
        }
    }
}

/// One round of the differencing loop.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StationarityStep {
    pub d: usize,
    pub test: StationarityTest,
    pub statistic: f64,
    pub p_value: f64,
    pub stationary: bool,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Stationarization {
    pub d: usize,
    pub steps: Vec<StationarityStep>,
    /// True when `max_d` was reached without the test accepting stationarity.
    pub exhausted: bool,
}

/// Differences `x` until the configured test deems it stationary, at most
/// `max_d` times.
pub fn stationarize(
    x: &[f64],
    config: &StationarityConfig,
) -> Result<Stationarization, StatError> {
    if !(config.alpha > 0.0 && config.alpha < 1.0) {
        return Err(StatError::invalid_input(format!(
            "stationarity alpha must be in (0, 1), got {}",
            config.alpha
        )));
    }

    let mut current = x.to_vec();
    let mut steps = vec![];
    for d in 0..=config.max_d {
        let (statistic, p_value, stationary) = match config.test {
            StationarityTest::Kpss => {
                let test = kpss_test(&current, None)?;
                (test.statistic, test.p_value, test.is_stationary(config.alpha))
            }
            StationarityTest::Adf => {
                let test = adf_test(&current, None)?;
                (test.statistic, test.p_value, test.is_stationary(config.alpha))
            }
        };
        tracing::debug!(
            test = config.test.label(),
            d,
            statistic,
            p_value,
            stationary,
            "stationarity test"
        );
        steps.push(StationarityStep {
            d,
            test: config.test,
            statistic,
            p_value,
            stationary,
        });
        if stationary {
            return Ok(Stationarization {
                d,
                steps,
                exhausted: false,
            });
        }
        if d < config.max_d {
            current = difference(&current, 1)?;
        }
    }

    tracing::warn!(
        max_d = config.max_d,
        test = config.test.label(),
        "series still non-stationary at max differencing order"
    );
    Ok(Stationarization {
        d: config.max_d,
        steps,
        exhausted: true,
    })
}

fn validate_finite(x: &[f64], context: &str) -> Result<(), StatError> {
    if let Some(idx) = x.iter().position(|v| !v.is_finite()) {
        return Err(StatError::invalid_input(format!(
            "{context} input index {idx} is not finite: {}",
            x[idx]
        )));
    }
    Ok(())
}

/// Piecewise-linear interpolation of `ys` over ascending `xs`, holding the
/// end values outside the table.
fn interpolate_clamped(xs: &[f64], ys: &[f64], at: f64) -> f64 {
    let last = xs.len() - 1;
    if at <= xs[0] {
        return ys[0];
    }
    if at >= xs[last] {
        return ys[last];
    }
    let upper = xs.partition_point(|x| *x <= at).min(last);
    let lower = upper - 1;
    let span = xs[upper] - xs[lower];
    if span <= 0.0 {
        return ys[lower];
    }
    let t = (at - xs[lower]) / span;
    ys[lower] + t * (ys[upper] - ys[lower])
}
