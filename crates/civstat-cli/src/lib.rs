// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use chrono::NaiveDate;
use civstat_arima::{Criterion, SearchStrategy};
use civstat_ingest::DataSource;
use civstat_pipeline::{
    CovidConfig, PipelineConfig, PipelineError, ReportFormat, ShootingsConfig, render,
    run_covid, run_shootings,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[command(name = "civstat", version, about = "Public-data statistics reports")]
pub struct Cli {
    /// Log filter directive for stderr, e.g. `debug` or `civstat_arima=debug`.
    /// Overrides RUST_LOG.
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compare monthly NYC shooting rates across boroughs.
    Shootings(ShootingsArgs),
    /// Forecast weekly Covid-19 deaths and backtest on the final year.
    Covid(CovidArgs),
    /// Print the default configuration as JSON.
    Config,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// JSON config file; flags override its fields.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = FormatArg::Json)]
    pub format: FormatArg,

    /// Write the report here instead of stdout.
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ShootingsArgs {
    #[command(flatten)]
    pub report: ReportArgs,

    /// Incident CSV as a URL or local path.
    #[arg(long, value_name = "URL|PATH")]
    pub source: Option<String>,

    #[arg(long)]
    pub alpha: Option<f64>,

    /// Family-wise confidence for Tukey HSD.
    #[arg(long)]
    pub confidence: Option<f64>,
}

#[derive(Debug, Args)]
pub struct CovidArgs {
    #[command(flatten)]
    pub report: ReportArgs,

    #[arg(long, value_name = "URL|PATH")]
    pub deaths: Option<String>,

    #[arg(long, value_name = "URL|PATH")]
    pub confirmed: Option<String>,

    /// Population lookup table.
    #[arg(long, value_name = "URL|PATH")]
    pub lookup: Option<String>,

    #[arg(long)]
    pub country: Option<String>,

    /// Week-ending date whose deaths were reported with the next week.
    /// Repeatable; replaces the configured list.
    #[arg(long = "missing-week", value_name = "YYYY-MM-DD")]
    pub missing_weeks: Vec<NaiveDate>,

    /// First held-out calendar year.
    #[arg(long)]
    pub split_year: Option<i32>,

    #[arg(long, value_enum)]
    pub search: Option<SearchArg>,

    #[arg(long, value_enum)]
    pub criterion: Option<CriterionArg>,

    #[arg(long)]
    pub max_p: Option<usize>,

    #[arg(long)]
    pub max_q: Option<usize>,

    /// Forecast horizon in weeks; defaults to the held-out length.
    #[arg(long)]
    pub horizon: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Json,
    Markdown,
}

impl From<FormatArg> for ReportFormat {
    fn from(value: FormatArg) -> Self {
        match value {
            FormatArg::Json => Self::Json,
            FormatArg::Markdown => Self::Markdown,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SearchArg {
    Exhaustive,
    Stepwise,
}

impl From<SearchArg> for SearchStrategy {
    fn from(value: SearchArg) -> Self {
        match value {
            SearchArg::Exhaustive => Self::Exhaustive,
            SearchArg::Stepwise => Self::Stepwise,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CriterionArg {
    Aic,
    Aicc,
    Bic,
}

impl From<CriterionArg> for Criterion {
    fn from(value: CriterionArg) -> Self {
        match value {
            CriterionArg::Aic => Self::Aic,
            CriterionArg::Aicc => Self::Aicc,
            CriterionArg::Bic => Self::Bic,
        }
    }
}

#[derive(Debug)]
pub enum CliError {
    Pipeline(PipelineError),
    Io {
        context: String,
        source: std::io::Error,
    },
    InvalidInput(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Pipeline(err) => err.code(),
            Self::Io { .. } => "io_error",
            Self::InvalidInput(_) => "invalid_input",
        }
    }

    /// `{"error": {"code", "message"}}` as pretty JSON.
    pub fn envelope(&self) -> String {
        let envelope = ErrorEnvelope {
            error: ErrorPayload {
                code: self.code().to_string(),
                message: self.to_string(),
            },
        };
        match serde_json::to_string_pretty(&envelope) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
                self.code(),
                self
            ),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pipeline(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Pipeline(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

/// Installs the stderr subscriber. `--log-level` wins over `RUST_LOG`,
/// which wins over `info`.
pub fn init_logging(level: Option<&str>) -> Result<(), CliError> {
    let filter = match level {
        Some(directive) => EnvFilter::try_new(directive).map_err(|err| {
            CliError::invalid_input(format!("invalid --log-level '{directive}': {err}"))
        })?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| CliError::invalid_input(format!("failed to install logging: {err}")))
}

pub fn run(cli: Cli) -> Result<(), CliError> {
    tracing::debug!(
        pipeline = civstat_pipeline::crate_name(),
        version = env!("CARGO_PKG_VERSION"),
        "starting"
    );
    match cli.command {
        Command::Shootings(args) => handle_shootings(args),
        Command::Covid(args) => handle_covid(args),
        Command::Config => {
            let json = PipelineConfig::default().to_json_pretty()?;
            println!("{json}");
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, CliError> {
    match path {
        Some(path) => Ok(PipelineConfig::load(path)?),
        None => Ok(PipelineConfig::default()),
    }
}

pub fn shootings_config(args: &ShootingsArgs) -> Result<ShootingsConfig, CliError> {
    let mut config = load_config(args.report.config.as_deref())?.shootings;
    if let Some(source) = &args.source {
        config.source = DataSource::parse(source);
    }
    if let Some(alpha) = args.alpha {
        config.alpha = alpha;
    }
    if let Some(confidence) = args.confidence {
        config.confidence = confidence;
    }
    config
        .validate()
        .map_err(|err| CliError::Pipeline(err.into()))?;
    Ok(config)
}

pub fn covid_config(args: &CovidArgs) -> Result<CovidConfig, CliError> {
    let mut config = load_config(args.report.config.as_deref())?.covid;
    if let Some(deaths) = &args.deaths {
        config.deaths = DataSource::parse(deaths);
    }
    if let Some(confirmed) = &args.confirmed {
        config.confirmed = DataSource::parse(confirmed);
    }
    if let Some(lookup) = &args.lookup {
        config.lookup = DataSource::parse(lookup);
    }
    if let Some(country) = &args.country {
        config.country = country.clone();
    }
    if !args.missing_weeks.is_empty() {
        config.missing_weeks = args.missing_weeks.clone();
    }
    if let Some(year) = args.split_year {
        config.split_year = Some(year);
    }
    if let Some(search) = args.search {
        config.search.strategy = search.into();
    }
    if let Some(criterion) = args.criterion {
        config.search.criterion = criterion.into();
    }
    if let Some(max_p) = args.max_p {
        config.search.max_p = max_p;
    }
    if let Some(max_q) = args.max_q {
        config.search.max_q = max_q;
    }
    if let Some(horizon) = args.horizon {
        config.horizon = Some(horizon);
    }
    config
        .validate()
        .map_err(|err| CliError::Pipeline(err.into()))?;
    Ok(config)
}

fn handle_shootings(args: ShootingsArgs) -> Result<(), CliError> {
    let config = shootings_config(&args)?;
    let report = run_shootings(&config)?;
    let text = render(&report, args.report.format.into())?;
    write_output(&text, args.report.output.as_deref())
}

fn handle_covid(args: CovidArgs) -> Result<(), CliError> {
    let config = covid_config(&args)?;
    let report = run_covid(&config)?;
    let text = render(&report, args.report.format.into())?;
    write_output(&text, args.report.output.as_deref())
}

fn write_output(text: &str, output_path: Option<&Path>) -> Result<(), CliError> {
    let text = text.trim_end();
    if let Some(path) = output_path {
        fs::write(path, format!("{text}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))?;
        tracing::info!(path = %path.display(), "report written");
        Ok(())
    } else {
        println!("{text}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, CliError, Command, covid_config, shootings_config};
    use chrono::NaiveDate;
    use civstat_arima::{Criterion, SearchStrategy};
    use civstat_ingest::DataSource;
    use clap::Parser;
    use std::io::Write;
    use std::path::PathBuf;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn covid_flags_override_defaults() {
        let cli = parse(&[
            "civstat",
            "covid",
            "--country",
            "Portugal",
            "--missing-week",
            "2021-03-07",
            "--missing-week",
            "2021-12-26",
            "--search",
            "exhaustive",
            "--criterion",
            "bic",
            "--max-p",
            "3",
            "--deaths",
            "/data/deaths.csv",
            "--format",
            "markdown",
            "--log-level",
            "debug",
        ]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        let Command::Covid(args) = cli.command else {
            panic!("expected covid command");
        };
        let config = covid_config(&args).expect("valid overrides");
        assert_eq!(config.country, "Portugal");
        assert_eq!(config.missing_weeks.len(), 2);
        assert_eq!(
            config.missing_weeks[0],
            NaiveDate::from_ymd_opt(2021, 3, 7).expect("valid date")
        );
        assert_eq!(config.search.strategy, SearchStrategy::Exhaustive);
        assert_eq!(config.search.criterion, Criterion::Bic);
        assert_eq!(config.search.max_p, 3);
        assert_eq!(config.search.max_q, 5);
        assert_eq!(
            config.deaths,
            DataSource::Path(PathBuf::from("/data/deaths.csv"))
        );
    }

    #[test]
    fn config_file_is_layered_under_flags() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"shootings": {{"alpha": 0.01, "source": "/data/shootings.csv"}}}}"#
        )
        .expect("write config");
        let path = file.path().to_str().expect("utf-8 path").to_string();
        let cli = parse(&["civstat", "shootings", "--config", &path, "--confidence", "0.9"]);
        let Command::Shootings(args) = cli.command else {
            panic!("expected shootings command");
        };
        let config = shootings_config(&args).expect("valid config");
        assert_eq!(config.alpha, 0.01);
        assert_eq!(config.confidence, 0.9);
        assert_eq!(
            config.source,
            DataSource::Path(PathBuf::from("/data/shootings.csv"))
        );
    }

    #[test]
    fn invalid_override_maps_to_invalid_input() {
        let cli = parse(&["civstat", "shootings", "--alpha", "2"]);
        let Command::Shootings(args) = cli.command else {
            panic!("expected shootings command");
        };
        let err = shootings_config(&args).expect_err("alpha out of range");
        assert_eq!(err.code(), "invalid_input");

        let envelope: serde_json::Value =
            serde_json::from_str(&err.envelope()).expect("envelope is JSON");
        assert_eq!(envelope["error"]["code"], "invalid_input");
        assert!(
            envelope["error"]["message"]
                .as_str()
                .is_some_and(|m| m.contains("shootings.alpha"))
        );
    }

    #[test]
    fn unknown_enum_values_are_rejected_by_the_parser() {
        assert!(Cli::try_parse_from(["civstat", "covid", "--criterion", "hqic"]).is_err());
        assert!(Cli::try_parse_from(["civstat", "covid", "--missing-week", "07/03/2021"]).is_err());
    }

    #[test]
    fn io_errors_carry_context() {
        let err = CliError::io(
            "failed to write '/nope/report.json'",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.code(), "io_error");
        assert_eq!(err.to_string(), "failed to write '/nope/report.json': denied");
    }
}
