// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::group::{SampleGroup, validate_groups};
use civstat_core::StatError;
use civstat_dist::f_sf;
use statrs::statistics::Statistics;

/// Welch's heteroscedastic one-way ANOVA result.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct WelchAnova {
    pub f_statistic: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub p_value: f64,
}

impl WelchAnova {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Welch (1951) test of equal means without assuming equal variances.
///
/// Agrees with R `oneway.test(var.equal = FALSE)`. Each group needs at least
/// two observations and a strictly positive sample variance.
pub fn welch_anova(groups: &[SampleGroup]) -> Result<WelchAnova, StatError> {
    validate_groups(groups, 2, "Welch ANOVA")?;

    let k = groups.len() as f64;
    let mut weights = Vec::with_capacity(groups.len());
    let mut means = Vec::with_capacity(groups.len());
    let mut sizes = Vec::with_capacity(groups.len());
    for group in groups {
        let variance = Statistics::variance(group.values.iter());
        if !(variance > 0.0) {
            return Err(StatError::numerical_issue(format!(
                "Welch ANOVA: group '{}' has zero variance",
                group.label
            )));
        }
        let n = group.len() as f64;
        weights.push(n / variance);
        means.push(Statistics::mean(group.values.iter()));
        sizes.push(n);
    }

    let total_weight: f64 = weights.iter().sum();
    let weighted_mean = weights
        .iter()
        .zip(&means)
        .map(|(w, m)| w * m)
        .sum::<f64>()
        / total_weight;

    let between = weights
        .iter()
        .zip(&means)
        .map(|(w, m)| w * (m - weighted_mean).powi(2))
        .sum::<f64>()
        / (k - 1.0);
    let tmp = weights
        .iter()
        .zip(&sizes)
        .map(|(w, n)| (1.0 - w / total_weight).powi(2) / (n - 1.0))
        .sum::<f64>();
    let adjustment = 1.0 + 2.0 * (k - 2.0) * tmp / (k * k - 1.0);

    let df_between = k - 1.0;
    if !(tmp > 0.0) {
        return Err(StatError::numerical_issue(
            "Welch ANOVA: degenerate denominator degrees of freedom",
        ));
    }
    let df_within = (k * k - 1.0) / (3.0 * tmp);
    let f_statistic = between / adjustment;
    let p_value = f_sf(f_statistic, df_between, df_within)?;

    Ok(WelchAnova {
        f_statistic,
        df_between,
        df_within,
        p_value,
    })
}
