// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use civstat_core::StatError;

/// Lagged first difference `x[t] − x[t − lag]`; the result is `lag` shorter.
pub fn difference(x: &[f64], lag: usize) -> Result<Vec<f64>, StatError> {
    if lag == 0 {
        return Err(StatError::invalid_input("difference lag must be >= 1"));
    }
    if x.len() <= lag {
        return Err(StatError::invalid_input(format!(
            "difference requires more than {lag} observations, got {}",
            x.len()
        )));
    }
    Ok(x.windows(lag + 1).map(|w| w[lag] - w[0]).collect())
}

/// Applies the lag-1 difference `d` times. `d == 0` returns a copy.
pub fn difference_n(x: &[f64], d: usize) -> Result<Vec<f64>, StatError> {
    let mut out = x.to_vec();
    for _ in 0..d {
        out = difference(&out, 1)?;
    }
    Ok(out)
}

/// Inverts [`difference_n`] for values continuing past the end of a series.
///
/// `tail` holds the last `d` observations of the undifferenced series, where
/// `d = tail.len()`; `diffs` are the d-times differenced values that follow
/// it. Returns the continuation on the original scale.
pub fn integrate(diffs: &[f64], tail: &[f64]) -> Result<Vec<f64>, StatError> {
    let d = tail.len();
    if d == 0 {
        return Ok(diffs.to_vec());
    }

    // Last observed value at each differencing level 0..d.
    let mut anchors = Vec::with_capacity(d);
    let mut level = tail.to_vec();
    for _ in 0..d {
        anchors.push(level[level.len() - 1]);
        if level.len() > 1 {
            level = difference(&level, 1)?;
        }
    }

    let mut current = diffs.to_vec();
    for anchor in anchors.into_iter().rev() {
        let mut running = anchor;
        for value in current.iter_mut() {
            running += *value;
            *value = running;
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::{difference, difference_n, integrate};

    #[test]
    fn difference_shortens_by_lag() {
        let x = [1.0, 4.0, 9.0, 16.0, 25.0];
        assert_eq!(difference(&x, 1).expect("valid"), vec![3.0, 5.0, 7.0, 9.0]);
        assert_eq!(difference(&x, 2).expect("valid"), vec![8.0, 12.0, 16.0]);
        assert_eq!(difference_n(&x, 2).expect("valid"), vec![2.0, 2.0, 2.0]);
        assert_eq!(difference_n(&x, 0).expect("valid"), x.to_vec());
        assert!(difference(&x, 0).is_err());
        assert!(difference(&x[..1], 1).is_err());
    }

    #[test]
    fn integrate_continues_the_original_series() {
        // Squares: second differences are constant 2.
        let x = [1.0, 4.0, 9.0, 16.0, 25.0];
        let next = integrate(&[2.0, 2.0], &x[3..]).expect("valid");
        assert_eq!(next, vec![36.0, 49.0]);

        let next = integrate(&[11.0, 13.0], &x[4..]).expect("valid");
        assert_eq!(next, vec![36.0, 49.0]);

        assert_eq!(integrate(&[1.5], &[]).expect("valid"), vec![1.5]);
    }
}
