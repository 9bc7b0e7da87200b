// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::{Days, NaiveDate, Weekday};
use civstat_core::{Diagnostics, YearMonth};
use civstat_ingest::{Borough, BoroughPopulation, IncidentRow, VictimDemographics};
use civstat_pipeline::covid::{apply_missing_week_corrections, weekly_totals};
use civstat_pipeline::shootings::{dedup_incidents, monthly_rates};
use civstat_pipeline::DailyNew;
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};
use std::collections::BTreeMap;

const MIN_PROPTEST_CASES: u32 = 128;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 1, 1).expect("valid epoch")
}

fn to_rows(raw: &[(u32, u64, bool)]) -> Vec<IncidentRow> {
    raw.iter()
        .map(|&(key, offset, murder)| IncidentRow {
            incident_key: format!("{key:05}"),
            occur_date: epoch() + Days::new(offset),
            borough: Borough::ALL[key as usize % Borough::ALL.len()],
            murder_flag: murder,
            victim: VictimDemographics {
                age_group: "25-44".to_string(),
                sex: "M".to_string(),
                race: "UNKNOWN".to_string(),
            },
        })
        .collect()
}

fn raw_rows() -> impl Strategy<Value = Vec<(u32, u64, bool)>> {
    prop::collection::vec((0u32..40, 0u64..730, any::<bool>()), 1..150)
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 256,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/proptest_invariants.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn rates_do_not_depend_on_row_order(
        (raw, shuffled) in raw_rows().prop_flat_map(|raw| (Just(raw.clone()), Just(raw).prop_shuffle())),
    ) {
        let population = BoroughPopulation::census_2020();
        let original = monthly_rates(&dedup_incidents(&to_rows(&raw)), &population)
            .expect("rates");
        let reordered = monthly_rates(&dedup_incidents(&to_rows(&shuffled)), &population)
            .expect("rates");
        prop_assert_eq!(original, reordered);
    }

    #[test]
    fn dedup_keeps_one_record_per_key_at_its_earliest_date(raw in raw_rows()) {
        let rows = to_rows(&raw);
        let incidents = dedup_incidents(&rows);

        let mut expected: BTreeMap<&str, (NaiveDate, u32)> = BTreeMap::new();
        for row in &rows {
            let entry = expected
                .entry(row.incident_key.as_str())
                .or_insert((row.occur_date, 0));
            entry.0 = entry.0.min(row.occur_date);
            entry.1 += 1;
        }
        prop_assert_eq!(incidents.len(), expected.len());
        for incident in &incidents {
            let (date, victims) = expected[incident.key.as_str()];
            prop_assert_eq!(incident.date, date);
            prop_assert_eq!(incident.victims, victims);
        }
        prop_assert!(incidents.windows(2).all(|pair| pair[0].key < pair[1].key));
    }

    #[test]
    fn rate_table_is_gap_free_and_non_negative(raw in raw_rows()) {
        let incidents = dedup_incidents(&to_rows(&raw));
        let table = monthly_rates(&incidents, &BoroughPopulation::census_2020()).expect("rates");
        let months = table.months();
        prop_assert!(months.windows(2).all(|pair| pair[0].succ() == pair[1]));
        prop_assert_eq!(table.len(), months.len() * Borough::ALL.len());
        for borough in Borough::ALL {
            for month in months {
                let rate = table.get(borough, *month);
                prop_assert!(rate.is_some_and(|r| r.rate_per_million >= 0.0));
            }
        }
        let first = incidents.iter().map(|i| YearMonth::of(i.date)).min();
        prop_assert_eq!(months.first().copied(), first);
        let total: u64 = table.iter().map(|(_, _, rate)| rate.incidents).sum();
        prop_assert_eq!(total as usize, incidents.len());
    }

    #[test]
    fn weekly_totals_sum_their_days_and_corrections_split_evenly(
        values in prop::collection::vec((0u32..500, 0u32..40), 21..120),
        start in 0u64..7,
        pick in any::<prop::sample::Index>(),
    ) {
        let first = epoch() + Days::new(start);
        let daily: Vec<DailyNew> = values
            .iter()
            .enumerate()
            .map(|(i, &(cases, deaths))| DailyNew {
                date: first + Days::new(i as u64),
                cases: f64::from(cases),
                deaths: f64::from(deaths),
            })
            .collect();
        let weeks = weekly_totals(&daily, Weekday::Sun, 4_900_000).expect("weeks");
        prop_assert!(!weeks.is_empty());
        for week in &weeks {
            let start = week.week_ending - Days::new(6);
            let (cases, deaths) = daily
                .iter()
                .filter(|day| day.date >= start && day.date <= week.week_ending)
                .fold((0.0, 0.0), |acc, day| (acc.0 + day.cases, acc.1 + day.deaths));
            prop_assert_eq!(week.days, 7);
            prop_assert_eq!(week.cases, cases);
            prop_assert_eq!(week.deaths, deaths);
        }

        // Treat one week as missing and fold it into its successor.
        let target = pick.index(weeks.len());
        prop_assume!(target + 1 < weeks.len());
        let mut corrected = weeks.clone();
        corrected.remove(target);
        let missing = weeks[target].week_ending;
        let original_following = corrected[target].deaths;
        let mut diagnostics = Diagnostics::for_pipeline("covid");
        apply_missing_week_corrections(&mut corrected, &[missing], &mut diagnostics)
            .expect("correction applies");
        prop_assert_eq!(corrected.len(), weeks.len());
        prop_assert_eq!(corrected[target].week_ending, missing);
        prop_assert_eq!(corrected[target].deaths, corrected[target + 1].deaths);
        prop_assert_eq!(
            corrected[target].deaths + corrected[target + 1].deaths,
            original_following
        );
        prop_assert_eq!(diagnostics.corrections.len(), 1);
    }
}
