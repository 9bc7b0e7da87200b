// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::covid::CovidReport;
use crate::error::PipelineError;
use crate::shootings::ShootingsReport;
use civstat_core::Diagnostics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Write};

const MAX_CANDIDATE_ROWS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    #[default]
    Json,
    Markdown,
}

/// A report that can be written as Markdown as well as JSON.
pub trait Render: Serialize {
    fn write_markdown(&self, out: &mut String) -> fmt::Result;
}

pub fn render<R: Render>(report: &R, format: ReportFormat) -> Result<String, PipelineError> {
    match format {
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::Markdown => {
            let mut out = String::new();
            report.write_markdown(&mut out)?;
            Ok(out)
        }
    }
}

fn p_value(p: f64) -> String {
    if p < 1e-4 {
        "< 0.0001".to_string()
    } else {
        format!("{p:.4}")
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag { "yes" } else { "no" }
}

fn write_counts(out: &mut String, title: &str, counts: &BTreeMap<String, u64>) -> fmt::Result {
    writeln!(out, "| {title} | Victims |")?;
    writeln!(out, "|---|---:|")?;
    for (key, count) in counts {
        writeln!(out, "| {key} | {count} |")?;
    }
    writeln!(out)
}

fn write_diagnostics(out: &mut String, diagnostics: &Diagnostics) -> fmt::Result {
    writeln!(out, "## Run diagnostics")?;
    writeln!(out)?;
    if let Some(ms) = diagnostics.runtime_ms {
        writeln!(out, "Runtime: {ms} ms")?;
        writeln!(out)?;
    }
    for correction in &diagnostics.corrections {
        writeln!(
            out,
            "- correction ({}, {} rows): {}",
            correction.dataset, correction.affected_rows, correction.description
        )?;
    }
    for warning in &diagnostics.warnings {
        writeln!(out, "- warning: {warning}")?;
    }
    for note in &diagnostics.notes {
        writeln!(out, "- note: {note}")?;
    }
    Ok(())
}

impl Render for ShootingsReport {
    fn write_markdown(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "# NYC shooting incidents by borough")?;
        writeln!(out)?;
        writeln!(
            out,
            "{} to {}: {} victim rows, {} distinct incidents ({} with several victims, {} fatal).",
            self.first_month,
            self.last_month,
            self.victim_rows,
            self.incidents,
            self.multi_victim_incidents,
            self.fatal_incidents
        )?;
        writeln!(out)?;

        writeln!(out, "## Monthly incidents per million residents")?;
        writeln!(out)?;
        writeln!(
            out,
            "| Borough | Months | Mean | SD | Min | Q1 | Median | Q3 | Max |"
        )?;
        writeln!(out, "|---|---:|---:|---:|---:|---:|---:|---:|---:|")?;
        for s in &self.descriptive {
            writeln!(
                out,
                "| {} | {} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} | {:.3} |",
                s.label, s.n, s.mean, s.std_dev, s.min, s.q1, s.median, s.q3, s.max
            )?;
        }
        writeln!(out)?;

        writeln!(out, "## Omnibus tests")?;
        writeln!(out)?;
        writeln!(out, "| Test | F | df1 | df2 | p |")?;
        writeln!(out, "|---|---:|---:|---:|---:|")?;
        writeln!(
            out,
            "| Welch ANOVA | {:.3} | {:.0} | {:.2} | {} |",
            self.welch.f_statistic,
            self.welch.df_between,
            self.welch.df_within,
            p_value(self.welch.p_value)
        )?;
        writeln!(
            out,
            "| Classic ANOVA | {:.3} | {:.0} | {:.0} | {} |",
            self.classic.f_statistic,
            self.classic.df_between,
            self.classic.df_within,
            p_value(self.classic.p_value)
        )?;
        writeln!(out)?;
        writeln!(
            out,
            "Mean monthly rates {} at alpha = {}.",
            if self.welch_significant {
                "differ between boroughs"
            } else {
                "do not differ significantly between boroughs"
            },
            self.alpha
        )?;
        writeln!(out)?;

        writeln!(
            out,
            "## Tukey HSD ({:.0}% family-wise confidence)",
            self.tukey.confidence * 100.0
        )?;
        writeln!(out)?;
        writeln!(out, "| Contrast | Diff | Lower | Upper | p adj | Significant |")?;
        writeln!(out, "|---|---:|---:|---:|---:|---|")?;
        let alpha = 1.0 - self.tukey.confidence;
        for c in &self.tukey.comparisons {
            writeln!(
                out,
                "| {} | {:.3} | {:.3} | {:.3} | {} | {} |",
                c.contrast(),
                c.diff,
                c.lower,
                c.upper,
                p_value(c.p_adjusted),
                yes_no(c.is_significant(alpha))
            )?;
        }
        writeln!(out)?;

        writeln!(out, "## Victims")?;
        writeln!(out)?;
        writeln!(
            out,
            "{} victims, {} flagged as murders.",
            self.demographics.victims, self.demographics.fatal_victims
        )?;
        writeln!(out)?;
        write_counts(out, "Age group", &self.demographics.by_age_group)?;
        write_counts(out, "Sex", &self.demographics.by_sex)?;
        write_counts(out, "Race", &self.demographics.by_race)?;

        write_diagnostics(out, &self.diagnostics)
    }
}

impl Render for CovidReport {
    fn write_markdown(&self, out: &mut String) -> fmt::Result {
        writeln!(out, "# Weekly Covid-19 deaths: {}", self.country)?;
        writeln!(out)?;
        writeln!(
            out,
            "Population {}. {} daily rows ({} negative), {} weeks ending {}. \
             Trained on {} weeks before {}, held out {}.",
            self.population,
            self.daily_rows,
            self.negative_daily_rows,
            self.weeks.len(),
            self.week_end,
            self.train_weeks,
            self.split_year,
            self.test_weeks
        )?;
        writeln!(out)?;

        writeln!(out, "## Stationarity")?;
        writeln!(out)?;
        writeln!(out, "| d | Test | Statistic | p | Stationary |")?;
        writeln!(out, "|---:|---|---:|---:|---|")?;
        for step in &self.stationarity.steps {
            writeln!(
                out,
                "| {} | {} | {:.4} | {} | {} |",
                step.d,
                step.test.label(),
                step.statistic,
                p_value(step.p_value),
                yes_no(step.stationary)
            )?;
        }
        writeln!(out)?;

        let best = &self.search.best;
        writeln!(out, "## Model selection")?;
        writeln!(out)?;
        writeln!(
            out,
            "{} search by {}: selected {} ({} = {:.3}); baseline {} scores {:.3}.",
            self.search.strategy.label(),
            self.search.criterion.label(),
            best.order,
            self.search.criterion.label(),
            best.criterion(self.search.criterion),
            self.search.baseline.order,
            self.search.baseline.score
        )?;
        writeln!(out)?;
        let mut ranked: Vec<_> = self.search.candidates.iter().collect();
        ranked.sort_by(|a, b| a.score.total_cmp(&b.score));
        writeln!(out, "| Order | Score | Converged |")?;
        writeln!(out, "|---|---:|---|")?;
        for candidate in ranked.into_iter().take(MAX_CANDIDATE_ROWS) {
            match &candidate.error {
                Some(err) => writeln!(out, "| {} | failed: {err} | no |", candidate.order)?,
                None => writeln!(
                    out,
                    "| {} | {:.3} | {} |",
                    candidate.order,
                    candidate.score,
                    yes_no(candidate.converged)
                )?,
            }
        }
        writeln!(out)?;
        writeln!(
            out,
            "AR {:?}, MA {:?}, mean {}, sigma^2 {:.4}, log-likelihood {:.3}.",
            best.ar,
            best.ma,
            best.mean
                .map_or_else(|| "none".to_string(), |m| format!("{m:.4}")),
            best.sigma2,
            best.loglik
        )?;
        writeln!(out)?;

        let r = &self.residuals;
        writeln!(out, "## Residual diagnostics")?;
        writeln!(out)?;
        writeln!(
            out,
            "- Ljung-Box Q = {:.3} (lag {}, df {}), p = {}: {}",
            r.ljung_box.statistic,
            r.ljung_box.lag,
            r.ljung_box.df,
            p_value(r.ljung_box.p_value),
            if r.independent {
                "no residual autocorrelation detected"
            } else {
                "residuals are autocorrelated"
            }
        )?;
        writeln!(
            out,
            "- mean {:.4}, sd {:.4}, t = {:.3}, p = {}: {}",
            r.mean,
            r.std_dev,
            r.t_statistic,
            p_value(r.t_p_value),
            if r.centered {
                "mean consistent with zero"
            } else {
                "mean differs from zero"
            }
        )?;
        writeln!(out)?;

        writeln!(out, "## Forecast against held-out weeks")?;
        writeln!(out)?;
        write!(out, "| Week ending | Actual | Forecast |")?;
        for interval in &self.forecast.intervals {
            let pct = interval.level * 100.0;
            write!(out, " Lo {pct:.0} | Hi {pct:.0} |")?;
        }
        writeln!(out)?;
        write!(out, "|---|---:|---:|")?;
        for _ in &self.forecast.intervals {
            write!(out, "---:|---:|")?;
        }
        writeln!(out)?;
        for (h, date) in self.forecast_dates.iter().enumerate() {
            let actual = self
                .charts
                .forecast
                .actual
                .get(h)
                .map_or_else(String::new, |a| format!("{a:.0}"));
            write!(out, "| {date} | {actual} | {:.1} |", self.forecast.mean[h])?;
            for interval in &self.forecast.intervals {
                write!(out, " {:.1} | {:.1} |", interval.lower[h], interval.upper[h])?;
            }
            writeln!(out)?;
        }
        writeln!(out)?;

        let b = &self.backtest;
        writeln!(out, "## Backtest")?;
        writeln!(out)?;
        writeln!(out, "- MAE {:.3}", b.mae)?;
        writeln!(out, "- RMSE {:.3}", b.rmse)?;
        match b.mape {
            Some(mape) => writeln!(out, "- MAPE {mape:.2}%")?,
            None => writeln!(out, "- MAPE undefined (all actuals zero)")?,
        }
        for coverage in &b.coverage {
            writeln!(
                out,
                "- {:.0}% interval covered {}/{} ({:.1}%)",
                coverage.level * 100.0,
                coverage.covered,
                coverage.total,
                coverage.rate * 100.0
            )?;
        }
        writeln!(out)?;

        write_diagnostics(out, &self.diagnostics)
    }
}
