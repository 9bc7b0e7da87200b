// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::forecast::Forecast;
use civstat_core::StatError;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalCoverage {
    pub level: f64,
    pub covered: usize,
    pub total: usize,
    pub rate: f64,
}

/// Forecast accuracy against held-out observations.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Backtest {
    /// `actual − forecast` per step.
    pub errors: Vec<f64>,
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error over steps with a non-zero actual;
    /// `None` when every actual is zero.
    pub mape: Option<f64>,
    pub coverage: Vec<IntervalCoverage>,
}

pub fn backtest(forecast: &Forecast, actual: &[f64]) -> Result<Backtest, StatError> {
    if actual.is_empty() {
        return Err(StatError::invalid_input("backtest needs at least one actual"));
    }
    if actual.len() != forecast.mean.len() {
        return Err(StatError::invalid_input(format!(
            "backtest length mismatch: {} actuals vs {} forecasts",
            actual.len(),
            forecast.mean.len()
        )));
    }
    if let Some(idx) = actual.iter().position(|v| !v.is_finite()) {
        return Err(StatError::invalid_input(format!(
            "actual index {idx} is not finite: {}",
            actual[idx]
        )));
    }

    let n = actual.len() as f64;
    let errors: Vec<f64> = actual
        .iter()
        .zip(&forecast.mean)
        .map(|(a, f)| a - f)
        .collect();
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
    let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();

    let percentage: Vec<f64> = actual
        .iter()
        .zip(&errors)
        .filter(|(a, _)| **a != 0.0)
        .map(|(a, e)| (e / a).abs() * 100.0)
        .collect();
    let mape = (!percentage.is_empty())
        .then(|| percentage.iter().sum::<f64>() / percentage.len() as f64);

    let coverage = forecast
        .intervals
        .iter()
        .map(|interval| {
            let covered = actual
                .iter()
                .zip(interval.lower.iter().zip(&interval.upper))
                .filter(|(a, (lo, hi))| *lo <= *a && *a <= *hi)
                .count();
            IntervalCoverage {
                level: interval.level,
                covered,
                total: actual.len(),
                rate: covered as f64 / n,
            }
        })
        .collect();

    Ok(Backtest {
        errors,
        mae,
        rmse,
        mape,
        coverage,
    })
}
