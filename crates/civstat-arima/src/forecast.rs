// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::diff::{difference_n, integrate};
use crate::model::ArimaFit;
use civstat_core::StatError;
use civstat_dist::standard_normal_quantile;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PredictionInterval {
    pub level: f64,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Forecast {
    pub horizon: usize,
    pub mean: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub intervals: Vec<PredictionInterval>,
}

impl Forecast {
    pub fn interval(&self, level: f64) -> Option<&PredictionInterval> {
        self.intervals
            .iter()
            .find(|interval| (interval.level - level).abs() < 1e-9)
    }
}

/// Point forecasts and normal prediction intervals `horizon` steps ahead.
///
/// Point forecasts recurse on the differenced scale with future shocks set
/// to zero and are then integrated back. Standard errors come from the
/// ψ-weights of `φ(B)(1 − B)^d`.
pub fn forecast(fit: &ArimaFit, horizon: usize, levels: &[f64]) -> Result<Forecast, StatError> {
    if horizon == 0 {
        return Err(StatError::invalid_input("forecast horizon must be >= 1"));
    }
    if let Some(level) = levels.iter().find(|l| !(**l > 0.0 && **l < 1.0)) {
        return Err(StatError::invalid_input(format!(
            "prediction interval level must be in (0, 1), got {level}"
        )));
    }

    let order = fit.order;
    let series = fit.series();
    if series.len() <= order.d {
        return Err(StatError::invalid_input(
            "fitted model does not carry its training series",
        ));
    }
    let w = difference_n(series, order.d)?;
    let mean = fit.mean.unwrap_or(0.0);

    // Residuals aligned with `w`; the first p are pre-sample and zero.
    let mut shocks = vec![0.0; w.len() - fit.residuals.len()];
    shocks.extend_from_slice(&fit.residuals);

    let mut extended = w.clone();
    let start = extended.len();
    for h in 0..horizon {
        let t = start + h;
        let mut value = mean;
        for (j, phi) in fit.ar.iter().enumerate() {
            value += phi * (extended[t - j - 1] - mean);
        }
        for (j, theta) in fit.ma.iter().enumerate() {
            let lagged = t - j - 1;
            if lagged < shocks.len() {
                value += theta * shocks[lagged];
            }
        }
        extended.push(value);
    }
    let differenced_forecast = &extended[start..];
    let tail = &series[series.len() - order.d..];
    let point = integrate(differenced_forecast, tail)?;

    let psi = psi_weights(&fit.ar, &fit.ma, order.d, horizon);
    let mut cumulative = 0.0;
    let std_errors: Vec<f64> = psi
        .iter()
        .map(|weight| {
            cumulative += weight * weight;
            (fit.sigma2 * cumulative).sqrt()
        })
        .collect();

    let mut intervals = Vec::with_capacity(levels.len());
    for &level in levels {
        let z = standard_normal_quantile(0.5 + level / 2.0)?;
        intervals.push(PredictionInterval {
            level,
            lower: point
                .iter()
                .zip(&std_errors)
                .map(|(m, se)| m - z * se)
                .collect(),
            upper: point
                .iter()
                .zip(&std_errors)
                .map(|(m, se)| m + z * se)
                .collect(),
        });
    }

    tracing::debug!(order = %order, horizon, "forecast computed");
    Ok(Forecast {
        horizon,
        mean: point,
        std_errors,
        intervals,
    })
}

/// First `count` ψ-weights of the MA(∞) form of ARIMA(p, d, q).
fn psi_weights(ar: &[f64], ma: &[f64], d: usize, count: usize) -> Vec<f64> {
    // Coefficients of 1 − Σ φ*_i Bⁱ = φ(B)(1 − B)^d, stored as the full
    // polynomial with leading 1.
    let mut poly = Vec::with_capacity(ar.len() + 1);
    poly.push(1.0);
    poly.extend(ar.iter().map(|phi| -phi));
    for _ in 0..d {
        let mut next = vec![0.0; poly.len() + 1];
        for (i, c) in poly.iter().enumerate() {
            next[i] += c;
            next[i + 1] -= c;
        }
        poly = next;
    }
    let full_ar: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

    let mut psi = Vec::with_capacity(count);
    psi.push(1.0);
    for j in 1..count {
        let mut value = ma.get(j - 1).copied().unwrap_or(0.0);
        for (i, phi) in full_ar.iter().enumerate().take(j) {
            value += phi * psi[j - i - 1];
        }
        psi.push(value);
    }
    psi
}

#[cfg(test)]
mod tests {
    use super::{forecast, psi_weights};
    use crate::{ArimaOrder, FitConfig, fit_arima};

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual} (tol={tol})"
        );
    }

    #[test]
    fn psi_weights_for_known_models() {
        // AR(1): ψ_j = φ^j
        let psi = psi_weights(&[0.5], &[], 0, 4);
        assert_eq!(psi, vec![1.0, 0.5, 0.25, 0.125]);
        // Random walk: ψ_j = 1
        let psi = psi_weights(&[], &[], 1, 4);
        assert_eq!(psi, vec![1.0, 1.0, 1.0, 1.0]);
        // MA(1): ψ = (1, θ, 0, ...)
        let psi = psi_weights(&[], &[0.4], 0, 3);
        assert_eq!(psi, vec![1.0, 0.4, 0.0]);
        // ARIMA(0,1,1): ψ_j = 1 + θ for j >= 1
        let psi = psi_weights(&[], &[0.4], 1, 3);
        assert_close(psi[1], 1.4, 1e-12);
        assert_close(psi[2], 1.4, 1e-12);
    }

    #[test]
    fn random_walk_forecast_is_flat_with_widening_intervals() {
        let series = vec![1.0, 3.0, 2.0, 4.0, 3.5, 5.0, 4.0, 6.0, 5.5, 7.0];
        let fit = fit_arima(&series, ArimaOrder::new(0, 1, 0), &FitConfig::default())
            .expect("fit should succeed");
        let fc = forecast(&fit, 3, &[0.8, 0.95]).expect("forecast should succeed");
        assert_eq!(fc.mean, vec![7.0, 7.0, 7.0]);
        assert_close(fc.std_errors[1], fc.std_errors[0] * 2.0_f64.sqrt(), 1e-12);

        let wide = fc.interval(0.95).expect("95% interval");
        let narrow = fc.interval(0.8).expect("80% interval");
        for h in 0..3 {
            assert!(wide.lower[h] < narrow.lower[h]);
            assert!(narrow.upper[h] < wide.upper[h]);
        }
        assert_close(wide.upper[0] - 7.0, 1.959_964 * fc.std_errors[0], 1e-5);
    }

    #[test]
    fn mean_model_forecasts_the_mean() {
        let series = vec![2.0, 4.0, 3.0, 5.0, 1.0, 3.0, 4.0, 2.0];
        let fit = fit_arima(&series, ArimaOrder::new(0, 0, 0), &FitConfig::default())
            .expect("fit should succeed");
        let fc = forecast(&fit, 2, &[0.95]).expect("forecast should succeed");
        assert_close(fc.mean[0], 3.0, 1e-4);
        assert_close(fc.mean[1], 3.0, 1e-4);
        assert_close(fc.std_errors[0], fc.std_errors[1], 1e-12);
    }

    #[test]
    fn rejects_bad_horizon_and_levels() {
        let series = vec![2.0, 4.0, 3.0, 5.0, 1.0, 3.0, 4.0, 2.0];
        let fit = fit_arima(&series, ArimaOrder::new(0, 0, 0), &FitConfig::default())
            .expect("fit should succeed");
        assert!(forecast(&fit, 0, &[0.95]).is_err());
        assert!(forecast(&fit, 2, &[1.5]).is_err());
    }
}
