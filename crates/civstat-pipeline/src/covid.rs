// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Weekly Covid-19 deaths: bucketing, correction, model selection and a
//! held-out forecast check.

use crate::charts::{ForecastFan, HeatmapCell, SeriesPoint, calendar_heatmap, forecast_fan};
use crate::config::CovidConfig;
use crate::error::PipelineError;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use civstat_arima::{
    Backtest, Forecast, OrderSearchOutcome, PredictionInterval, ResidualDiagnostics,
    Stationarization, backtest, diagnose_residuals, forecast, search_orders, stationarize,
};
use civstat_core::{DatedSeries, Diagnostics, StatError, week_ending};
use civstat_ingest::DailyCumulative;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

const DATASET: &str = "jhu_covid19";
const WEEK: Days = Days::new(7);

/// New cases and deaths reported on one day.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DailyNew {
    pub date: NaiveDate,
    pub cases: f64,
    pub deaths: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeeklyTotal {
    pub week_ending: NaiveDate,
    pub cases: f64,
    pub deaths: f64,
    /// Daily rows that fell in the week; 0 for an inserted missing week.
    pub days: u32,
    pub deaths_per_million: f64,
}

/// First differences of the cumulative series. The first day has no
/// predecessor and is dropped. Returns the rows and how many of them carry
/// a negative case or death count.
pub fn daily_new(cumulative: &[DailyCumulative]) -> (Vec<DailyNew>, usize) {
    let daily: Vec<DailyNew> = cumulative
        .windows(2)
        .map(|pair| DailyNew {
            date: pair[1].date,
            cases: pair[1].cases - pair[0].cases,
            deaths: pair[1].deaths - pair[0].deaths,
        })
        .collect();
    let negative = daily
        .iter()
        .filter(|day| day.cases < 0.0 || day.deaths < 0.0)
        .count();
    (daily, negative)
}

/// Sums daily rows into weeks closing on `week_end`. A leading or trailing
/// week with fewer than seven days is dropped.
pub fn weekly_totals(
    daily: &[DailyNew],
    week_end: Weekday,
    population: u64,
) -> Result<Vec<WeeklyTotal>, StatError> {
    if population == 0 {
        return Err(StatError::invalid_input("population must be positive"));
    }
    let mut buckets: BTreeMap<NaiveDate, WeeklyTotal> = BTreeMap::new();
    for day in daily {
        let end = week_ending(day.date, week_end)?;
        let bucket = buckets.entry(end).or_insert(WeeklyTotal {
            week_ending: end,
            cases: 0.0,
            deaths: 0.0,
            days: 0,
            deaths_per_million: 0.0,
        });
        bucket.cases += day.cases;
        bucket.deaths += day.deaths;
        bucket.days += 1;
    }

    let mut weeks: Vec<WeeklyTotal> = buckets.into_values().collect();
    if weeks.last().is_some_and(|week| week.days < 7) {
        weeks.pop();
    }
    if weeks.first().is_some_and(|week| week.days < 7) {
        weeks.remove(0);
    }
    for week in &mut weeks {
        week.deaths_per_million = week.deaths / population as f64 * 1_000_000.0;
    }
    Ok(weeks)
}

/// Splits each following week's totals evenly with the configured missing
/// week before it. The missing week is inserted when absent and overwritten
/// when present.
pub fn apply_missing_week_corrections(
    weeks: &mut Vec<WeeklyTotal>,
    missing: &[NaiveDate],
    diagnostics: &mut Diagnostics,
) -> Result<(), StatError> {
    let mut missing = missing.to_vec();
    missing.sort_unstable();
    missing.dedup();

    for week in missing {
        let following_end = week.checked_add_days(WEEK).ok_or_else(|| {
            StatError::invalid_input(format!("missing week {week} is out of range"))
        })?;
        let Ok(following) = weeks.binary_search_by_key(&following_end, |w| w.week_ending) else {
            return Err(StatError::invalid_input(format!(
                "missing week {week} has no following week ending {following_end} to split"
            )));
        };

        let total = weeks[following];
        let half = WeeklyTotal {
            week_ending: week,
            cases: total.cases / 2.0,
            deaths: total.deaths / 2.0,
            days: 0,
            deaths_per_million: total.deaths_per_million / 2.0,
        };
        weeks[following] = WeeklyTotal {
            week_ending: following_end,
            days: total.days,
            ..half
        };

        match following
            .checked_sub(1)
            .filter(|&idx| weeks[idx].week_ending == week)
        {
            Some(idx) => {
                weeks[idx] = WeeklyTotal {
                    days: weeks[idx].days,
                    ..half
                }
            }
            None => weeks.insert(following, half),
        }
        diagnostics.correction(
            DATASET,
            format!(
                "split {} deaths of week ending {following_end} evenly with missing week ending {week}",
                total.deaths
            ),
            2,
        );
    }
    Ok(())
}

/// Week-ending dates absent between the first and last week.
pub fn weekly_gaps(weeks: &[WeeklyTotal]) -> Vec<NaiveDate> {
    let mut gaps = vec![];
    for pair in weeks.windows(2) {
        let mut expected = pair[0].week_ending.checked_add_days(WEEK);
        while let Some(date) = expected.filter(|date| *date < pair[1].week_ending) {
            gaps.push(date);
            expected = date.checked_add_days(WEEK);
        }
    }
    gaps
}

/// Splits weeks at a calendar-year boundary. `split_year` defaults to the
/// year of the last week, holding out the final (usually partial) year.
pub fn split_by_year(
    weeks: &[WeeklyTotal],
    split_year: Option<i32>,
) -> Result<(Vec<WeeklyTotal>, Vec<WeeklyTotal>), StatError> {
    let Some(last) = weeks.last() else {
        return Err(StatError::invalid_input("no weekly totals to split"));
    };
    let year = split_year.unwrap_or_else(|| last.week_ending.year());
    let series = DatedSeries::new(
        weeks.iter().map(|w| w.week_ending).collect(),
        weeks.iter().map(|w| w.deaths).collect(),
    )?;
    let (train, _) = series.split_at_year(year)?;
    let (train, test) = weeks.split_at(train.len());
    Ok((train.to_vec(), test.to_vec()))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CovidCharts {
    pub daily_deaths: Vec<SeriesPoint>,
    pub daily_cases: Vec<SeriesPoint>,
    pub weekly_deaths: Vec<SeriesPoint>,
    pub heatmap: Vec<HeatmapCell>,
    pub forecast: ForecastFan,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CovidReport {
    pub diagnostics: Diagnostics,
    pub country: String,
    pub population: u64,
    pub week_end: Weekday,
    pub daily_rows: usize,
    pub negative_daily_rows: usize,
    pub weeks: Vec<WeeklyTotal>,
    pub split_year: i32,
    pub train_weeks: usize,
    pub test_weeks: usize,
    pub stationarity: Stationarization,
    pub search: OrderSearchOutcome,
    pub residuals: ResidualDiagnostics,
    pub forecast: Forecast,
    pub forecast_dates: Vec<NaiveDate>,
    /// Accuracy over the steps where forecast and held-out weeks overlap.
    pub backtest: Backtest,
    pub charts: CovidCharts,
}

/// Runs the weekly-deaths forecasting pipeline for one country.
pub fn analyze(
    cumulative: &[DailyCumulative],
    population: u64,
    config: &CovidConfig,
) -> Result<CovidReport, PipelineError> {
    let started = Instant::now();
    config.validate()?;
    let mut diagnostics = Diagnostics::for_pipeline("covid");
    let _span = tracing::info_span!("covid", country = %config.country).entered();

    if cumulative.len() < 2 {
        return Err(StatError::invalid_input(format!(
            "need at least 2 cumulative rows, got {}",
            cumulative.len()
        ))
        .into());
    }
    let (daily, negative) = daily_new(cumulative);
    diagnostics.note(format!(
        "dropped first cumulative row ({}) with no predecessor",
        cumulative[0].date
    ));
    if negative > 0 {
        diagnostics.warn(format!(
            "{negative} daily rows have negative counts from retroactive corrections; left as reported"
        ));
    }

    let mut weeks = weekly_totals(&daily, config.week_end, population)?;
    let bucketed: u32 = weeks.iter().map(|w| w.days).sum();
    let partial = daily.len().saturating_sub(bucketed as usize);
    if partial > 0 {
        diagnostics.note(format!(
            "dropped {partial} days in partial leading or trailing weeks"
        ));
    }
    apply_missing_week_corrections(&mut weeks, &config.missing_weeks, &mut diagnostics)?;
    for gap in weekly_gaps(&weeks) {
        diagnostics.warn(format!("week ending {gap} is missing and not configured"));
    }
    tracing::info!(
        daily = daily.len(),
        weeks = weeks.len(),
        "bucketed weekly totals"
    );

    let (train, test) = split_by_year(&weeks, config.split_year)?;
    let split_year = config
        .split_year
        .unwrap_or_else(|| test[test.len() - 1].week_ending.year());
    let train_deaths: Vec<f64> = train.iter().map(|w| w.deaths).collect();
    let test_deaths: Vec<f64> = test.iter().map(|w| w.deaths).collect();
    tracing::info!(
        train = train.len(),
        test = test.len(),
        split_year,
        "split weekly deaths"
    );

    let stationarity = stationarize(&train_deaths, &config.stationarity)?;
    if stationarity.exhausted {
        diagnostics.warn(format!(
            "{} test still rejects stationarity at d = {}",
            config.stationarity.test.label(),
            stationarity.d
        ));
    }
    let search = search_orders(&train_deaths, &config.search, Some(stationarity.d))?;
    let residuals = diagnose_residuals(&search.best, &config.residuals)?;
    if !residuals.independent {
        diagnostics.warn(format!(
            "Ljung-Box p = {:.4} suggests autocorrelated residuals for {}",
            residuals.ljung_box.p_value, search.best.order
        ));
    }
    if !residuals.centered {
        diagnostics.warn(format!(
            "residual mean {:.4} differs from zero (t-test p = {:.4})",
            residuals.mean, residuals.t_p_value
        ));
    }

    let horizon = config.horizon.unwrap_or(test.len());
    let predicted = forecast(&search.best, horizon, &config.levels)?;
    let overlap = horizon.min(test.len());
    let accuracy = backtest(&truncate(&predicted, overlap), &test_deaths[..overlap])?;
    tracing::info!(
        order = %search.best.order,
        horizon,
        mae = accuracy.mae,
        rmse = accuracy.rmse,
        "forecast backtested"
    );

    let forecast_dates = forecast_dates(&train, horizon)?;
    let charts = CovidCharts {
        daily_deaths: daily
            .iter()
            .map(|day| SeriesPoint {
                date: day.date,
                value: day.deaths,
            })
            .collect(),
        daily_cases: daily
            .iter()
            .map(|day| SeriesPoint {
                date: day.date,
                value: day.cases,
            })
            .collect(),
        weekly_deaths: weeks
            .iter()
            .map(|week| SeriesPoint {
                date: week.week_ending,
                value: week.deaths,
            })
            .collect(),
        heatmap: calendar_heatmap(&daily),
        forecast: forecast_fan(forecast_dates.clone(), &predicted, &test_deaths),
    };
    diagnostics.runtime_ms = Some(started.elapsed().as_millis() as u64);

    Ok(CovidReport {
        diagnostics,
        country: config.country.clone(),
        population,
        week_end: config.week_end,
        daily_rows: daily.len(),
        negative_daily_rows: negative,
        split_year,
        train_weeks: train.len(),
        test_weeks: test.len(),
        weeks,
        stationarity,
        search,
        residuals,
        forecast: predicted,
        forecast_dates,
        backtest: accuracy,
        charts,
    })
}

/// Week-ending dates for the `horizon` weeks after the training data.
fn forecast_dates(train: &[WeeklyTotal], horizon: usize) -> Result<Vec<NaiveDate>, StatError> {
    let mut dates = Vec::with_capacity(horizon);
    let mut current = train
        .last()
        .map(|w| w.week_ending)
        .ok_or_else(|| StatError::invalid_input("training part is empty"))?;
    for _ in 0..horizon {
        current = current
            .checked_add_days(WEEK)
            .ok_or_else(|| StatError::invalid_input("forecast dates overflow"))?;
        dates.push(current);
    }
    Ok(dates)
}

fn truncate(forecast: &Forecast, steps: usize) -> Forecast {
    Forecast {
        horizon: steps,
        mean: forecast.mean[..steps].to_vec(),
        std_errors: forecast.std_errors[..steps].to_vec(),
        intervals: forecast
            .intervals
            .iter()
            .map(|interval| PredictionInterval {
                level: interval.level,
                lower: interval.lower[..steps].to_vec(),
                upper: interval.upper[..steps].to_vec(),
            })
            .collect(),
    }
}
