// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Tukey honestly-significant-difference pairwise comparisons.
//!
//! Uses the Tukey–Kramer standard error so unequal group sizes are handled;
//! with equal sizes it matches R `TukeyHSD(aov(...))`.

use crate::group::{SampleGroup, validate_groups};
use civstat_core::StatError;
use civstat_dist::StudentizedRange;
use statrs::statistics::Statistics;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct PairwiseComparison {
    pub group_a: String,
    pub group_b: String,
    /// `mean(group_b) − mean(group_a)`.
    pub diff: f64,
    pub lower: f64,
    pub upper: f64,
    pub q_statistic: f64,
    pub p_adjusted: f64,
}

impl PairwiseComparison {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_adjusted < alpha
    }

    /// R-style contrast label, `b-a`.
    pub fn contrast(&self) -> String {
        format!("{}-{}", self.group_b, self.group_a)
    }
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct TukeyHsd {
    pub confidence: f64,
    pub df: f64,
    pub mse: f64,
    pub critical_q: f64,
    pub comparisons: Vec<PairwiseComparison>,
}

impl TukeyHsd {
    pub fn significant_pairs(&self, alpha: f64) -> impl Iterator<Item = &PairwiseComparison> {
        self.comparisons
            .iter()
            .filter(move |cmp| cmp.is_significant(alpha))
    }

    /// Finds the comparison between two labels regardless of their order.
    pub fn pair(&self, a: &str, b: &str) -> Option<&PairwiseComparison> {
        self.comparisons.iter().find(|cmp| {
            (cmp.group_a == a && cmp.group_b == b) || (cmp.group_a == b && cmp.group_b == a)
        })
    }
}

/// All `k(k−1)/2` pairwise comparisons at family-wise `confidence`.
///
/// Pairs are emitted with `group_a` preceding `group_b` in input order.
pub fn tukey_hsd(groups: &[SampleGroup], confidence: f64) -> Result<TukeyHsd, StatError> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(StatError::invalid_input(format!(
            "Tukey HSD confidence must be in (0, 1), got {confidence}"
        )));
    }
    validate_groups(groups, 1, "Tukey HSD")?;

    let k = groups.len();
    let total_n: usize = groups.iter().map(SampleGroup::len).sum();
    if total_n < k + 2 {
        return Err(StatError::invalid_input(format!(
            "Tukey HSD needs at least 2 residual degrees of freedom, got {}",
            total_n.saturating_sub(k)
        )));
    }

    let means: Vec<f64> = groups
        .iter()
        .map(|g| Statistics::mean(g.values.iter()))
        .collect();
    let ss_within: f64 = groups
        .iter()
        .zip(&means)
        .map(|(g, mean)| g.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>())
        .sum();
    let df = (total_n - k) as f64;
    let mse = ss_within / df;
    if !(mse > 0.0) {
        return Err(StatError::numerical_issue(
            "Tukey HSD: pooled within-group variance is zero",
        ));
    }

    let dist = StudentizedRange::new(k, df)?;
    let critical_q = dist.quantile(confidence)?;

    let mut comparisons = Vec::with_capacity(k * (k - 1) / 2);
    for a in 0..k {
        for b in (a + 1)..k {
            let n_a = groups[a].len() as f64;
            let n_b = groups[b].len() as f64;
            let se = (mse / 2.0 * (1.0 / n_a + 1.0 / n_b)).sqrt();
            let diff = means[b] - means[a];
            let q_statistic = diff.abs() / se;
            comparisons.push(PairwiseComparison {
                group_a: groups[a].label.clone(),
                group_b: groups[b].label.clone(),
                diff,
                lower: diff - critical_q * se,
                upper: diff + critical_q * se,
                q_statistic,
                p_adjusted: dist.sf(q_statistic).clamp(0.0, 1.0),
            });
        }
    }

    Ok(TukeyHsd {
        confidence,
        df,
        mse,
        critical_q,
        comparisons,
    })
}
