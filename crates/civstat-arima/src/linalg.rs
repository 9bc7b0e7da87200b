// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use civstat_core::StatError;

const RANK_TOLERANCE: f64 = 1e-10;

/// Ordinary least squares estimates with coefficient standard errors.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct OlsFit {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub residual_ss: f64,
    pub df_residual: usize,
}

/// Solves `min ||y − Xβ||²` through the Cholesky factor of `XᵀX`.
///
/// `rows` holds the design matrix row-major; every row must have the same
/// width. Requires more rows than columns.
pub(crate) fn ols(rows: &[Vec<f64>], y: &[f64]) -> Result<OlsFit, StatError> {
    let n = rows.len();
    if n != y.len() {
        return Err(StatError::invalid_input(format!(
            "OLS design has {n} rows but response has {} values",
            y.len()
        )));
    }
    let p = rows.first().map_or(0, Vec::len);
    if p == 0 || rows.iter().any(|row| row.len() != p) {
        return Err(StatError::invalid_input(
            "OLS design rows must be non-empty and equally wide",
        ));
    }
    if n <= p {
        return Err(StatError::invalid_input(format!(
            "OLS needs more observations ({n}) than regressors ({p})"
        )));
    }

    let mut gram = vec![0.0; p * p];
    let mut xty = vec![0.0; p];
    for (row, target) in rows.iter().zip(y) {
        for i in 0..p {
            xty[i] += row[i] * target;
            for j in 0..=i {
                gram[i * p + j] += row[i] * row[j];
            }
        }
    }
    for i in 0..p {
        for j in (i + 1)..p {
            gram[i * p + j] = gram[j * p + i];
        }
    }

    cholesky_in_place(&mut gram, p)?;
    let coefficients = cholesky_solve(&gram, p, &xty);

    let residual_ss = rows
        .iter()
        .zip(y)
        .map(|(row, target)| {
            let fitted: f64 = row.iter().zip(&coefficients).map(|(x, b)| x * b).sum();
            (target - fitted).powi(2)
        })
        .sum::<f64>();
    let df_residual = n - p;
    let sigma2 = residual_ss / df_residual as f64;

    // diag((XᵀX)⁻¹) column by column.
    let mut std_errors = Vec::with_capacity(p);
    let mut unit = vec![0.0; p];
    for j in 0..p {
        unit.iter_mut().for_each(|v| *v = 0.0);
        unit[j] = 1.0;
        let column = cholesky_solve(&gram, p, &unit);
        std_errors.push((sigma2 * column[j]).max(0.0).sqrt());
    }

    Ok(OlsFit {
        coefficients,
        std_errors,
        residual_ss,
        df_residual,
    })
}

/// Lower-triangular Cholesky factorization of a row-major `n × n` matrix.
///
/// Pivots below `RANK_TOLERANCE` relative to the original diagonal are
/// treated as rank deficiency.
fn cholesky_in_place(matrix: &mut [f64], n: usize) -> Result<(), StatError> {
    for i in 0..n {
        let diagonal = matrix[i * n + i];
        for j in 0..=i {
            let mut sum = matrix[i * n + j];
            for k in 0..j {
                sum -= matrix[i * n + k] * matrix[j * n + k];
            }

            if i == j {
                if !sum.is_finite() || sum <= diagonal.abs() * RANK_TOLERANCE {
                    return Err(StatError::numerical_issue(
                        "regression design is rank deficient",
                    ));
                }
                matrix[i * n + i] = sum.sqrt();
            } else {
                matrix[i * n + j] = sum / matrix[j * n + j];
            }
        }

        for j in i + 1..n {
            matrix[i * n + j] = 0.0;
        }
    }
    Ok(())
}

/// Solves `L Lᵀ x = b` given the factor from [`cholesky_in_place`].
fn cholesky_solve(factor: &[f64], n: usize, b: &[f64]) -> Vec<f64> {
    let mut z = vec![0.0; n];
    for i in 0..n {
        let partial: f64 = (0..i).map(|k| factor[i * n + k] * z[k]).sum();
        z[i] = (b[i] - partial) / factor[i * n + i];
    }
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let partial: f64 = ((i + 1)..n).map(|k| factor[k * n + i] * x[k]).sum();
        x[i] = (z[i] - partial) / factor[i * n + i];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::ols;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual} (tol={tol})"
        );
    }

    #[test]
    fn ols_recovers_exact_line() {
        let rows: Vec<Vec<f64>> = (0..6).map(|t| vec![1.0, t as f64]).collect();
        let y: Vec<f64> = (0..6).map(|t| 3.0 + 0.5 * t as f64).collect();
        let fit = ols(&rows, &y).expect("full rank design");
        assert_close(fit.coefficients[0], 3.0, 1e-10);
        assert_close(fit.coefficients[1], 0.5, 1e-10);
        assert_close(fit.residual_ss, 0.0, 1e-16);
        assert_eq!(fit.df_residual, 4);
    }

    #[test]
    fn ols_standard_errors_match_closed_form() {
        // lm(y ~ t) for t = 0..4, y = (1, 3, 2, 5, 4): slope 0.8, se 0.3464
        let rows: Vec<Vec<f64>> = (0..5).map(|t| vec![1.0, t as f64]).collect();
        let y = [1.0, 3.0, 2.0, 5.0, 4.0];
        let fit = ols(&rows, &y).expect("full rank design");
        assert_close(fit.coefficients[1], 0.8, 1e-10);
        assert_close(fit.coefficients[0], 1.4, 1e-10);
        assert_close(fit.std_errors[1], 0.346_4, 1e-4);
    }

    #[test]
    fn ols_rejects_collinear_design() {
        let rows: Vec<Vec<f64>> = (0..5).map(|t| vec![t as f64, 2.0 * t as f64]).collect();
        let y = [1.0, 2.0, 3.0, 4.0, 5.0];
        let err = ols(&rows, &y).expect_err("collinear should fail");
        assert_eq!(err.code(), "numerical_issue");
    }
}
