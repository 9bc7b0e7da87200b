// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Derivative-free Nelder–Mead simplex minimizer.

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct NelderMeadConfig {
    pub max_iterations: usize,
    /// Relative tolerance on the spread of simplex values.
    pub tolerance: f64,
    pub initial_step: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct NelderMeadResult {
    pub point: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

/// Minimizes `objective` from `start`. Non-finite objective values are
/// treated as `+∞`, so infeasible regions simply repel the simplex.
pub(crate) fn nelder_mead<F>(
    mut objective: F,
    start: &[f64],
    config: &NelderMeadConfig,
) -> NelderMeadResult
where
    F: FnMut(&[f64]) -> f64,
{
    let mut eval = |x: &[f64]| {
        let value = objective(x);
        if value.is_finite() { value } else { f64::INFINITY }
    };

    let dim = start.len();
    if dim == 0 {
        return NelderMeadResult {
            point: vec![],
            value: eval(start),
            iterations: 0,
            converged: true,
        };
    }

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(dim + 1);
    simplex.push(start.to_vec());
    for i in 0..dim {
        let mut vertex = start.to_vec();
        vertex[i] += config.initial_step;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    let mut iterations = 0;
    let mut converged = false;
    while iterations < config.max_iterations {
        let mut order: Vec<usize> = (0..=dim).collect();
        order.sort_by(|a, b| values[*a].total_cmp(&values[*b]));
        simplex = order.iter().map(|i| simplex[*i].clone()).collect();
        values = order.iter().map(|i| values[*i]).collect();

        let best = values[0];
        let worst = values[dim];
        if (worst - best).abs() <= config.tolerance * (best.abs() + config.tolerance) {
            converged = true;
            break;
        }
        iterations += 1;

        let centroid: Vec<f64> = (0..dim)
            .map(|j| simplex[..dim].iter().map(|v| v[j]).sum::<f64>() / dim as f64)
            .collect();
        let toward = |coef: f64, from: &[f64]| -> Vec<f64> {
            centroid
                .iter()
                .zip(from)
                .map(|(c, x)| c + coef * (x - c))
                .collect()
        };

        let reflected = toward(-REFLECTION, &simplex[dim]);
        let reflected_value = eval(&reflected);

        if reflected_value < values[0] {
            let expanded = toward(-EXPANSION, &simplex[dim]);
            let expanded_value = eval(&expanded);
            if expanded_value < reflected_value {
                simplex[dim] = expanded;
                values[dim] = expanded_value;
            } else {
                simplex[dim] = reflected;
                values[dim] = reflected_value;
            }
            continue;
        }
        if reflected_value < values[dim - 1] {
            simplex[dim] = reflected;
            values[dim] = reflected_value;
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < values[dim] {
            let outside = toward(-CONTRACTION, &simplex[dim]);
            let value = eval(&outside);
            (outside, value)
        } else {
            let inside = toward(CONTRACTION, &simplex[dim]);
            let value = eval(&inside);
            (inside, value)
        };
        if contracted_value < values[dim].min(reflected_value) {
            simplex[dim] = contracted;
            values[dim] = contracted_value;
            continue;
        }

        let anchor = simplex[0].clone();
        for i in 1..=dim {
            let shrunk: Vec<f64> = anchor
                .iter()
                .zip(&simplex[i])
                .map(|(a, x)| a + SHRINK * (x - a))
                .collect();
            values[i] = eval(&shrunk);
            simplex[i] = shrunk;
        }
    }

    let best_idx = (0..=dim)
        .min_by(|a, b| values[*a].total_cmp(&values[*b]))
        .unwrap_or(0);
    NelderMeadResult {
        point: simplex[best_idx].clone(),
        value: values[best_idx],
        iterations,
        converged,
    }
}
