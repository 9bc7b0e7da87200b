// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use civstat_anova::{SampleGroup, one_way_anova, summarize, tukey_hsd, welch_anova};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

const MIN_PROPTEST_CASES: u32 = 256;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn groups_strategy() -> impl Strategy<Value = Vec<SampleGroup>> {
    prop::collection::vec(prop::collection::vec(-100.0f64..100.0, 3..20), 2..6).prop_map(
        |samples| {
            samples
                .into_iter()
                .enumerate()
                .map(|(idx, values)| SampleGroup::new(format!("g{idx}"), values))
                .collect()
        },
    )
}

fn has_spread(groups: &[SampleGroup]) -> bool {
    groups.iter().all(|g| {
        let first = g.values[0];
        g.values.iter().any(|v| (v - first).abs() > 1e-6)
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 1024,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/proptest_invariants.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn p_values_are_probabilities(groups in groups_strategy()) {
        prop_assume!(has_spread(&groups));

        let welch = welch_anova(&groups).expect("welch should succeed");
        prop_assert!((0.0..=1.0).contains(&welch.p_value));
        prop_assert!(welch.f_statistic >= 0.0);
        prop_assert!(welch.df_within > 0.0);

        let classic = one_way_anova(&groups).expect("classic should succeed");
        prop_assert!((0.0..=1.0).contains(&classic.p_value));

        let hsd = tukey_hsd(&groups, 0.95).expect("tukey should succeed");
        let k = groups.len();
        prop_assert_eq!(hsd.comparisons.len(), k * (k - 1) / 2);
        for cmp in &hsd.comparisons {
            prop_assert!((0.0..=1.0).contains(&cmp.p_adjusted));
            prop_assert!(cmp.lower <= cmp.diff && cmp.diff <= cmp.upper);
        }
    }

    #[test]
    fn shifting_every_group_leaves_tests_unchanged(
        groups in groups_strategy(),
        shift in -1000.0f64..1000.0,
    ) {
        prop_assume!(has_spread(&groups));
        let shifted: Vec<SampleGroup> = groups
            .iter()
            .map(|g| SampleGroup::new(g.label.clone(), g.values.iter().map(|v| v + shift).collect()))
            .collect();

        let base = welch_anova(&groups).expect("welch should succeed");
        let moved = welch_anova(&shifted).expect("welch should succeed");
        prop_assert!((base.p_value - moved.p_value).abs() < 1e-6);

        let base = tukey_hsd(&groups, 0.95).expect("tukey should succeed");
        let moved = tukey_hsd(&shifted, 0.95).expect("tukey should succeed");
        for (a, b) in base.comparisons.iter().zip(&moved.comparisons) {
            prop_assert!((a.diff - b.diff).abs() < 1e-6);
        }
    }

    #[test]
    fn summary_quartiles_are_ordered(values in prop::collection::vec(-1e6f64..1e6, 1..64)) {
        let summary = summarize("x", &values).expect("summary should succeed");
        prop_assert!(summary.min <= summary.q1);
        prop_assert!(summary.q1 <= summary.median);
        prop_assert!(summary.median <= summary.q3);
        prop_assert!(summary.q3 <= summary.max);
        prop_assert!(summary.variance >= 0.0);
    }
}
