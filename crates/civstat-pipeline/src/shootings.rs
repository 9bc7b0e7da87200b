// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Monthly shooting-incident rates per borough and their comparison.
//!
//! Victim rows are collapsed to distinct incidents, counted per
//! (borough, month), scaled by borough population and compared with Welch's
//! ANOVA followed by Tukey HSD. Victim counts only feed the demographic
//! summary.

use crate::charts::{BoxPlot, RateLine, box_plots, rate_lines};
use crate::config::ShootingsConfig;
use crate::error::PipelineError;
use chrono::NaiveDate;
use civstat_anova::{
    GroupSummary, OneWayAnova, SampleGroup, TukeyHsd, WelchAnova, one_way_anova, summarize,
    tukey_hsd, welch_anova,
};
use civstat_core::{Diagnostics, StatError, YearMonth};
use civstat_ingest::{Borough, BoroughPopulation, IncidentRow};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

const DATASET: &str = "nypd_shootings";
const AGE_GROUP_TYPO: &str = "1022";
const AGE_GROUP_UNKNOWN: &str = "UNKNOWN";

/// One distinct shooting incident.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub key: String,
    /// Earliest occurrence date among the incident's rows.
    pub date: NaiveDate,
    /// Borough of the first row seen for the key.
    pub borough: Borough,
    pub victims: u32,
    /// Any victim row carries the statistical murder flag.
    pub fatal: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRate {
    pub incidents: u64,
    pub population: u64,
    pub rate_per_million: f64,
}

/// One cell of [`MonthlyRateTable`] in flat form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRateRow {
    pub borough: Borough,
    pub month: YearMonth,
    #[serde(flatten)]
    pub rate: MonthlyRate,
}

/// Rates for every borough in every month from the first to the last month
/// with any incident.
#[derive(Clone, Debug, PartialEq)]
pub struct MonthlyRateTable {
    months: Vec<YearMonth>,
    cells: BTreeMap<(Borough, YearMonth), MonthlyRate>,
    gap_filled: usize,
}

impl MonthlyRateTable {
    pub fn months(&self) -> &[YearMonth] {
        &self.months
    }

    pub fn get(&self, borough: Borough, month: YearMonth) -> Option<&MonthlyRate> {
        self.cells.get(&(borough, month))
    }

    /// Number of (borough, month) cells that had no incident and were
    /// zero-filled.
    pub fn gap_filled(&self) -> usize {
        self.gap_filled
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Borough, YearMonth, &MonthlyRate)> + '_ {
        self.cells
            .iter()
            .map(|((borough, month), rate)| (*borough, *month, rate))
    }

    pub fn rows(&self) -> Vec<MonthlyRateRow> {
        self.iter()
            .map(|(borough, month, rate)| MonthlyRateRow {
                borough,
                month,
                rate: *rate,
            })
            .collect()
    }
}

/// Collapses victim rows to one [`Incident`] per key, sorted by key.
pub fn dedup_incidents(rows: &[IncidentRow]) -> Vec<Incident> {
    let (incidents, conflicts) = dedup_with_conflicts(rows);
    for key in &conflicts {
        tracing::warn!(incident_key = %key, "incident rows disagree on borough; kept first seen");
    }
    incidents
}

/// Also returns the keys whose rows disagree on borough.
fn dedup_with_conflicts(rows: &[IncidentRow]) -> (Vec<Incident>, BTreeSet<String>) {
    let mut by_key: BTreeMap<&str, Incident> = BTreeMap::new();
    let mut conflicts = BTreeSet::new();
    for row in rows {
        match by_key.entry(row.incident_key.as_str()) {
            Entry::Vacant(slot) => {
                slot.insert(Incident {
                    key: row.incident_key.clone(),
                    date: row.occur_date,
                    borough: row.borough,
                    victims: 1,
                    fatal: row.murder_flag,
                });
            }
            Entry::Occupied(mut slot) => {
                let incident = slot.get_mut();
                incident.date = incident.date.min(row.occur_date);
                incident.victims += 1;
                incident.fatal |= row.murder_flag;
                if incident.borough != row.borough && !conflicts.contains(&incident.key) {
                    conflicts.insert(incident.key.clone());
                }
            }
        }
    }
    (by_key.into_values().collect(), conflicts)
}

pub fn monthly_counts(incidents: &[Incident]) -> BTreeMap<(Borough, YearMonth), u64> {
    let mut counts = BTreeMap::new();
    for incident in incidents {
        *counts
            .entry((incident.borough, YearMonth::of(incident.date)))
            .or_insert(0) += 1;
    }
    counts
}

/// Aggregates incidents per (borough, month), zero-fills missing cells and
/// scales by population to incidents per million residents.
pub fn monthly_rates(
    incidents: &[Incident],
    population: &BoroughPopulation,
) -> Result<MonthlyRateTable, StatError> {
    let counts = monthly_counts(incidents);
    let (Some(first), Some(last)) = (
        counts.keys().map(|(_, month)| *month).min(),
        counts.keys().map(|(_, month)| *month).max(),
    ) else {
        return Err(StatError::invalid_input(
            "monthly rates need at least one incident",
        ));
    };

    let months = YearMonth::range_inclusive(first, last);
    let mut cells = BTreeMap::new();
    let mut gap_filled = 0;
    for borough in Borough::ALL {
        let residents = population.get(borough);
        if residents == 0 {
            return Err(StatError::invalid_input(format!(
                "no population for {borough}"
            )));
        }
        for &month in &months {
            let count = match counts.get(&(borough, month)) {
                Some(count) => *count,
                None => {
                    gap_filled += 1;
                    0
                }
            };
            cells.insert(
                (borough, month),
                MonthlyRate {
                    incidents: count,
                    population: residents,
                    rate_per_million: count as f64 / residents as f64 * 1_000_000.0,
                },
            );
        }
    }

    Ok(MonthlyRateTable {
        months,
        cells,
        gap_filled,
    })
}

/// Rate samples per borough, in month order.
pub fn borough_groups(table: &MonthlyRateTable) -> Vec<(Borough, Vec<f64>)> {
    Borough::ALL
        .iter()
        .map(|&borough| {
            let rates = table
                .months
                .iter()
                .filter_map(|month| table.get(borough, *month))
                .map(|rate| rate.rate_per_million)
                .collect();
            (borough, rates)
        })
        .collect()
}

/// Maps known typos in the export to their intended values.
pub fn apply_known_fixups(rows: &mut [IncidentRow], diagnostics: &mut Diagnostics) {
    let mut fixed = 0;
    for row in rows.iter_mut() {
        if row.victim.age_group == AGE_GROUP_TYPO {
            row.victim.age_group = AGE_GROUP_UNKNOWN.to_string();
            fixed += 1;
        }
    }
    if fixed > 0 {
        diagnostics.correction(
            DATASET,
            format!("VIC_AGE_GROUP '{AGE_GROUP_TYPO}' mapped to '{AGE_GROUP_UNKNOWN}'"),
            fixed,
        );
    }
}

/// Victim counts by demographic attribute.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct DemographicSummary {
    pub victims: usize,
    pub fatal_victims: usize,
    pub by_age_group: BTreeMap<String, u64>,
    pub by_sex: BTreeMap<String, u64>,
    pub by_race: BTreeMap<String, u64>,
    pub by_borough: BTreeMap<Borough, u64>,
}

pub fn demographic_summary(rows: &[IncidentRow]) -> DemographicSummary {
    let mut summary = DemographicSummary {
        victims: rows.len(),
        ..DemographicSummary::default()
    };
    for row in rows {
        if row.murder_flag {
            summary.fatal_victims += 1;
        }
        *summary
            .by_age_group
            .entry(row.victim.age_group.clone())
            .or_insert(0) += 1;
        *summary.by_sex.entry(row.victim.sex.clone()).or_insert(0) += 1;
        *summary.by_race.entry(row.victim.race.clone()).or_insert(0) += 1;
        *summary.by_borough.entry(row.borough).or_insert(0) += 1;
    }
    summary
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShootingsCharts {
    pub rate_lines: Vec<RateLine>,
    pub box_plots: Vec<BoxPlot>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShootingsReport {
    pub diagnostics: Diagnostics,
    pub first_month: YearMonth,
    pub last_month: YearMonth,
    pub victim_rows: usize,
    pub incidents: usize,
    pub multi_victim_incidents: usize,
    pub fatal_incidents: usize,
    pub alpha: f64,
    pub descriptive: Vec<GroupSummary>,
    pub welch: WelchAnova,
    pub welch_significant: bool,
    /// Equal-variance F test, reported for comparison only.
    pub classic: OneWayAnova,
    pub tukey: TukeyHsd,
    pub demographics: DemographicSummary,
    pub monthly_rates: Vec<MonthlyRateRow>,
    pub charts: ShootingsCharts,
}

/// Runs the full borough comparison over raw victim rows.
pub fn analyze(
    mut rows: Vec<IncidentRow>,
    population: &BoroughPopulation,
    config: &ShootingsConfig,
) -> Result<ShootingsReport, PipelineError> {
    let started = Instant::now();
    config.validate()?;
    let mut diagnostics = Diagnostics::for_pipeline("shootings");
    let _span = tracing::info_span!("shootings", rows = rows.len()).entered();

    apply_known_fixups(&mut rows, &mut diagnostics);

    let (incidents, conflicts) = dedup_with_conflicts(&rows);
    for key in &conflicts {
        diagnostics.warn(format!(
            "incident {key} has rows in more than one borough; kept the first seen"
        ));
    }
    let multi_victim_incidents = incidents.iter().filter(|i| i.victims > 1).count();
    let fatal_incidents = incidents.iter().filter(|i| i.fatal).count();
    diagnostics.note(format!(
        "{} victim rows collapsed to {} distinct incidents ({multi_victim_incidents} with several victims)",
        rows.len(),
        incidents.len()
    ));
    tracing::info!(
        victim_rows = rows.len(),
        incidents = incidents.len(),
        "deduplicated incidents"
    );

    let table = monthly_rates(&incidents, population)?;
    let (first_month, last_month) = match (table.months.first(), table.months.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(StatError::invalid_input("rate table has no months").into()),
    };
    if table.gap_filled() > 0 {
        diagnostics.note(format!(
            "zero-filled {} borough-months without incidents",
            table.gap_filled()
        ));
    }
    tracing::info!(
        months = table.months.len(),
        from = %first_month,
        to = %last_month,
        "computed monthly rates"
    );

    let groups: Vec<SampleGroup> = borough_groups(&table)
        .into_iter()
        .map(|(borough, rates)| SampleGroup::new(borough.label(), rates))
        .collect();
    let descriptive = groups
        .iter()
        .map(|group| summarize(group.label.as_str(), &group.values))
        .collect::<Result<Vec<_>, _>>()?;

    let welch = welch_anova(&groups)?;
    let welch_significant = welch.is_significant(config.alpha);
    let classic = one_way_anova(&groups)?;
    let tukey = tukey_hsd(&groups, config.confidence)?;
    tracing::info!(
        f = welch.f_statistic,
        p = welch.p_value,
        significant = welch_significant,
        "Welch ANOVA"
    );
    tracing::info!(
        significant_pairs = tukey.significant_pairs(1.0 - config.confidence).count(),
        comparisons = tukey.comparisons.len(),
        "Tukey HSD"
    );

    let charts = ShootingsCharts {
        rate_lines: rate_lines(&table),
        box_plots: box_plots(&descriptive),
    };
    diagnostics.runtime_ms = Some(started.elapsed().as_millis() as u64);

    Ok(ShootingsReport {
        diagnostics,
        first_month,
        last_month,
        victim_rows: rows.len(),
        incidents: incidents.len(),
        multi_victim_incidents,
        fatal_incidents,
        alpha: config.alpha,
        descriptive,
        welch,
        welch_significant,
        classic,
        tukey,
        demographics: demographic_summary(&rows),
        monthly_rates: table.rows(),
        charts,
    })
}

#[cfg(test)]
mod tests {
    use super::{
        analyze, apply_known_fixups, borough_groups, dedup_incidents, dedup_with_conflicts,
        demographic_summary, monthly_counts, monthly_rates,
    };
    use crate::config::ShootingsConfig;
    use chrono::NaiveDate;
    use civstat_core::{Diagnostics, YearMonth};
    use civstat_ingest::{Borough, BoroughPopulation, IncidentRow, VictimDemographics};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    fn row(key: &str, date: NaiveDate, borough: Borough, murder: bool) -> IncidentRow {
        IncidentRow {
            incident_key: key.to_string(),
            occur_date: date,
            borough,
            murder_flag: murder,
            victim: VictimDemographics {
                age_group: "25-44".to_string(),
                sex: "M".to_string(),
                race: "BLACK".to_string(),
            },
        }
    }

    #[test]
    fn dedup_keeps_one_incident_per_key_with_earliest_date() {
        let rows = vec![
            row("200", date(2020, 3, 5), Borough::Queens, false),
            row("100", date(2020, 1, 9), Borough::Bronx, false),
            row("200", date(2020, 3, 4), Borough::Queens, true),
            row("100", date(2020, 1, 9), Borough::Bronx, false),
        ];
        let incidents = dedup_incidents(&rows);
        assert_eq!(incidents.len(), 2);
        assert_eq!(incidents[0].key, "100");
        assert_eq!(incidents[0].victims, 2);
        assert!(!incidents[0].fatal);
        assert_eq!(incidents[1].key, "200");
        assert_eq!(incidents[1].date, date(2020, 3, 4));
        assert!(incidents[1].fatal);
    }

    #[test]
    fn conflicting_borough_keeps_first_seen() {
        let rows = vec![
            row("7", date(2021, 6, 1), Borough::Manhattan, false),
            row("7", date(2021, 6, 1), Borough::Bronx, false),
        ];
        let incidents = dedup_incidents(&rows);
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].borough, Borough::Manhattan);
    }

    #[test]
    fn each_conflicting_key_is_reported_once() {
        let mut rows = vec![];
        for i in 0..500 {
            let borough = if i % 2 == 0 { Borough::Queens } else { Borough::Brooklyn };
            rows.push(row("9", date(2021, 6, 1), borough, false));
            rows.push(row("4", date(2021, 6, 1), borough, false));
            rows.push(row("5", date(2021, 6, 1), Borough::Bronx, false));
        }
        let (incidents, conflicts) = dedup_with_conflicts(&rows);
        assert_eq!(incidents.len(), 3);
        assert_eq!(
            conflicts.into_iter().collect::<Vec<_>>(),
            vec!["4".to_string(), "9".to_string()]
        );
    }

    #[test]
    fn rates_are_gap_filled_across_the_full_month_range() {
        let rows = vec![
            row("1", date(2020, 1, 2), Borough::Bronx, false),
            row("2", date(2020, 1, 20), Borough::Bronx, false),
            row("3", date(2020, 3, 15), Borough::Queens, false),
        ];
        let incidents = dedup_incidents(&rows);
        let counts = monthly_counts(&incidents);
        assert_eq!(counts.len(), 2);

        let population = BoroughPopulation::census_2020();
        let table = monthly_rates(&incidents, &population).expect("rates");
        assert_eq!(table.months().len(), 3);
        assert_eq!(table.len(), 15);
        assert_eq!(table.gap_filled(), 13);

        let jan = YearMonth::new(2020, 1).expect("valid month");
        let bronx = table.get(Borough::Bronx, jan).expect("cell present");
        assert_eq!(bronx.incidents, 2);
        assert_eq!(bronx.population, 1_472_654);
        assert!((bronx.rate_per_million - 2.0 / 1_472_654.0 * 1e6).abs() < 1e-12);

        let feb = YearMonth::new(2020, 2).expect("valid month");
        let staten = table.get(Borough::StatenIsland, feb).expect("zero-filled");
        assert_eq!(staten.incidents, 0);
        assert_eq!(staten.rate_per_million, 0.0);

        let groups = borough_groups(&table);
        assert_eq!(groups.len(), 5);
        assert_eq!(groups[0].0, Borough::Bronx);
        assert_eq!(groups[0].1.len(), 3);
        assert_eq!(groups[0].1[1], 0.0);
    }

    #[test]
    fn no_incidents_is_invalid_input() {
        let err = monthly_rates(&[], &BoroughPopulation::census_2020()).expect_err("empty");
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn age_group_typo_is_corrected_and_recorded() {
        let mut rows = vec![
            row("1", date(2020, 1, 2), Borough::Bronx, false),
            row("2", date(2020, 1, 3), Borough::Bronx, false),
        ];
        rows[1].victim.age_group = "1022".to_string();
        let mut diagnostics = Diagnostics::for_pipeline("shootings");
        apply_known_fixups(&mut rows, &mut diagnostics);
        assert_eq!(rows[1].victim.age_group, "UNKNOWN");
        assert_eq!(diagnostics.corrections.len(), 1);
        assert_eq!(diagnostics.corrections[0].affected_rows, 1);

        let summary = demographic_summary(&rows);
        assert_eq!(summary.by_age_group.get("UNKNOWN"), Some(&1));
        assert_eq!(summary.by_age_group.get("25-44"), Some(&1));
    }

    fn synthetic_rows() -> Vec<IncidentRow> {
        // Incidents per month per borough; Brooklyn and the Bronx run hot.
        let base = [
            (Borough::Bronx, [30, 34, 28, 33, 31, 29, 35, 32, 30, 27, 33, 36]),
            (Borough::Brooklyn, [55, 60, 52, 58, 63, 57, 61, 54, 59, 56, 62, 58]),
            (Borough::Manhattan, [12, 15, 11, 14, 13, 16, 12, 10, 15, 13, 14, 12]),
            (Borough::Queens, [14, 12, 17, 15, 13, 16, 18, 12, 14, 15, 13, 17]),
            (Borough::StatenIsland, [2, 3, 1, 4, 2, 3, 2, 1, 3, 2, 4, 3]),
        ];
        let mut rows = vec![];
        let mut key = 0;
        for (borough, counts) in base {
            for (month, count) in counts.iter().enumerate() {
                for i in 0..*count {
                    key += 1;
                    let day = 1 + (i % 28) as u32;
                    let occurred = date(2021, month as u32 + 1, day);
                    rows.push(row(&key.to_string(), occurred, borough, i % 5 == 0));
                    if i % 7 == 0 {
                        rows.push(row(&key.to_string(), occurred, borough, false));
                    }
                }
            }
        }
        rows
    }

    #[test]
    fn analyze_compares_boroughs_end_to_end() {
        let rows = synthetic_rows();
        let report = analyze(
            rows.clone(),
            &BoroughPopulation::census_2020(),
            &ShootingsConfig::default(),
        )
        .expect("analysis should succeed");

        assert_eq!(report.victim_rows, rows.len());
        assert!(report.incidents < report.victim_rows);
        assert!(report.multi_victim_incidents > 0);
        assert_eq!(report.descriptive.len(), 5);
        assert_eq!(report.monthly_rates.len(), 60);
        assert_eq!(report.first_month, YearMonth::new(2021, 1).expect("month"));
        assert_eq!(report.last_month, YearMonth::new(2021, 12).expect("month"));
        assert!(report.welch_significant, "p = {}", report.welch.p_value);
        assert!(report.classic.p_value < 0.05);
        assert_eq!(report.tukey.comparisons.len(), 10);

        // Bronx ~21/M vs Manhattan ~8/M per month.
        let pair = report
            .tukey
            .pair("Bronx", "Manhattan")
            .expect("pair present");
        assert!(pair.is_significant(0.05));
        assert_eq!(report.charts.rate_lines.len(), 5);
        assert_eq!(report.charts.box_plots.len(), 5);
        assert!(report.diagnostics.runtime_ms.is_some());
    }
}
