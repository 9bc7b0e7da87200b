// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Unconstrained reparameterization of ARMA polynomials.
//!
//! An unconstrained vector is squashed with `tanh` into partial
//! autocorrelations in (−1, 1), which the Durbin–Levinson recursion maps onto
//! the coefficients of a stationary AR polynomial. Applying the same map to
//! the MA part keeps it invertible.

/// Maps unconstrained values to AR coefficients `φ` with all roots of
/// `1 − Σ φ_j zʲ` outside the unit circle.
pub(crate) fn to_stationary(raw: &[f64]) -> Vec<f64> {
    let pacf: Vec<f64> = raw.iter().map(|v| v.tanh()).collect();
    durbin_levinson(&pacf)
}

/// Maps unconstrained values to MA coefficients `θ` of `1 + Σ θ_j Bʲ` with
/// all roots outside the unit circle.
pub(crate) fn to_invertible(raw: &[f64]) -> Vec<f64> {
    to_stationary(raw).into_iter().map(|v| -v).collect()
}

fn durbin_levinson(pacf: &[f64]) -> Vec<f64> {
    let mut coefficients = pacf.to_vec();
    let mut work = pacf.to_vec();
    for j in 1..pacf.len() {
        let a = coefficients[j];
        for k in 0..j {
            work[k] -= a * coefficients[j - k - 1];
        }
        coefficients[..j].copy_from_slice(&work[..j]);
    }
    coefficients
}
