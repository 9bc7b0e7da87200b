// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::group::{SampleGroup, validate_groups};
use civstat_core::StatError;
use civstat_dist::f_sf;
use statrs::statistics::Statistics;

/// Classic equal-variance one-way ANOVA table.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct OneWayAnova {
    pub f_statistic: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub ss_between: f64,
    pub ss_within: f64,
    pub ms_within: f64,
    pub p_value: f64,
}

impl OneWayAnova {
    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

pub fn one_way_anova(groups: &[SampleGroup]) -> Result<OneWayAnova, StatError> {
    validate_groups(groups, 1, "one-way ANOVA")?;

    let total_n: usize = groups.iter().map(SampleGroup::len).sum();
    let k = groups.len();
    if total_n <= k {
        return Err(StatError::invalid_input(format!(
            "one-way ANOVA needs more observations ({total_n}) than groups ({k})"
        )));
    }

    let grand_mean = Statistics::mean(groups.iter().flat_map(|g| g.values.iter()));
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for group in groups {
        let mean = Statistics::mean(group.values.iter());
        ss_between += group.len() as f64 * (mean - grand_mean).powi(2);
        ss_within += group.values.iter().map(|v| (v - mean).powi(2)).sum::<f64>();
    }

    let df_between = (k - 1) as f64;
    let df_within = (total_n - k) as f64;
    let ms_between = ss_between / df_between;
    let ms_within = ss_within / df_within;

    let f_statistic = if ms_within > 0.0 {
        ms_between / ms_within
    } else if ss_between > 0.0 {
        f64::INFINITY
    } else {
        return Err(StatError::numerical_issue(
            "one-way ANOVA: all observations are identical",
        ));
    };
    let p_value = f_sf(f_statistic, df_between, df_within)?;

    Ok(OneWayAnova {
        f_statistic,
        df_between,
        df_within,
        ss_between,
        ss_within,
        ms_within,
        p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::one_way_anova;
    use crate::SampleGroup;

    fn assert_close(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual} (tol={tol})"
        );
    }

    #[test]
    fn anova_table_matches_hand_computation() {
        // Means 2, 5, 8 around a grand mean of 5; each group SS = 2.
        let groups = vec![
            SampleGroup::new("a", vec![1.0, 2.0, 3.0]),
            SampleGroup::new("b", vec![4.0, 5.0, 6.0]),
            SampleGroup::new("c", vec![7.0, 8.0, 9.0]),
        ];
        let table = one_way_anova(&groups).expect("valid groups");
        assert_close(table.ss_between, 54.0, 1e-10);
        assert_close(table.ss_within, 6.0, 1e-10);
        assert_close(table.ms_within, 1.0, 1e-10);
        assert_close(table.f_statistic, 27.0, 1e-10);
        assert_eq!(table.df_between, 2.0);
        assert_eq!(table.df_within, 6.0);
        // pf(27, 2, 6, lower.tail = FALSE) = 0.001
        assert_close(table.p_value, 0.001, 1e-4);
        assert!(table.is_significant(0.01));
    }

    #[test]
    fn constant_data_is_rejected() {
        let groups = vec![
            SampleGroup::new("a", vec![1.0, 1.0]),
            SampleGroup::new("b", vec![1.0, 1.0]),
        ];
        assert!(one_way_anova(&groups).is_err());
    }

    #[test]
    fn separated_constant_groups_are_infinitely_significant() {
        let groups = vec![
            SampleGroup::new("a", vec![1.0, 1.0]),
            SampleGroup::new("b", vec![2.0, 2.0]),
        ];
        let table = one_way_anova(&groups).expect("valid groups");
        assert!(table.f_statistic.is_infinite());
        assert_eq!(table.p_value, 0.0);
    }
}
