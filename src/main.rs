//! CLI entry point for the AWD compliance tool.
//!
//! Provides subcommands for scoring a registry and reading export, listing
//! the season calendar, and checking that an export's headers resolve.

use anyhow::{Result, bail};
use awd_compliance::analyzers::rollup::{ResultFilter, RollupKey, Summary, rollup, summarize};
use awd_compliance::analyzers::rule::RuleKind;
use awd_compliance::analyzers::types::{MonitoringRow, PaymentRow};
use awd_compliance::config::{EngineConfig, ParticipationPolicy};
use awd_compliance::engine::{RunStatus, compute};
use awd_compliance::output::{log_diagnostics, print_pretty, write_json, write_records};
use awd_compliance::parser::read_table;
use awd_compliance::periods::{PeriodStrategy, season_weeks};
use awd_compliance::registry::Group;
use awd_compliance::schema::{ReadingColumns, RegistrySchema};
use awd_compliance::stats::Diagnostics;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "awd_compliance")]
#[command(about = "Score AWD pipe readings and compute farm incentives", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RuleArg {
    TwoMeasurement,
    GapFree,
    SingleAdmissible,
}

impl From<RuleArg> for RuleKind {
    fn from(arg: RuleArg) -> Self {
        match arg {
            RuleArg::TwoMeasurement => RuleKind::TwoMeasurement,
            RuleArg::GapFree => RuleKind::GapFree,
            RuleArg::SingleAdmissible => RuleKind::SingleAdmissible,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PeriodArg {
    Fixed,
    Dynamic,
    FullRange,
}

impl From<PeriodArg> for PeriodStrategy {
    fn from(arg: PeriodArg) -> Self {
        match arg {
            PeriodArg::Fixed => PeriodStrategy::Fixed,
            PeriodArg::Dynamic => PeriodStrategy::Dynamic,
            PeriodArg::FullRange => PeriodStrategy::FullRange,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum RollupArg {
    Village,
    Group,
    Period,
}

impl From<RollupArg> for RollupKey {
    fn from(arg: RollupArg) -> Self {
        match arg {
            RollupArg::Village => RollupKey::Village,
            RollupArg::Group => RollupKey::Group,
            RollupArg::Period => RollupKey::Period,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ParticipationArg {
    DropBeforeClassification,
    ClassifyThenFilter,
    Ignore,
}

impl From<ParticipationArg> for ParticipationPolicy {
    fn from(arg: ParticipationArg) -> Self {
        match arg {
            ParticipationArg::DropBeforeClassification => {
                ParticipationPolicy::DropBeforeClassification
            }
            ParticipationArg::ClassifyThenFilter => ParticipationPolicy::ClassifyThenFilter,
            ParticipationArg::Ignore => ParticipationPolicy::Ignore,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Score readings against the registry and write payment and monitoring tables
    Analyze {
        /// Farm registry CSV
        #[arg(long)]
        registry: PathBuf,

        /// Water-level readings CSV
        #[arg(long)]
        readings: PathBuf,

        /// JSON config file; flags below override its values
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Compliance rule (required unless set in the config file)
        #[arg(long, value_enum)]
        rule: Option<RuleArg>,

        /// Period strategy (required unless set in the config file)
        #[arg(long, value_enum)]
        periods: Option<PeriodArg>,

        /// First day of the analysis range (YYYY-MM-DD)
        #[arg(long)]
        start: Option<NaiveDate>,

        /// Last day of the analysis range (YYYY-MM-DD)
        #[arg(long)]
        end: Option<NaiveDate>,

        /// Keep only these period numbers (repeatable)
        #[arg(long = "week")]
        weeks: Vec<u32>,

        /// Keep only these groups, e.g. A-Complied (repeatable)
        #[arg(long = "group")]
        groups: Vec<Group>,

        /// Rollup tables to write (repeatable; default all)
        #[arg(long = "rollup", value_enum)]
        rollups: Vec<RollupArg>,

        /// Handling of farms outside the study
        #[arg(long, value_enum)]
        participation: Option<ParticipationArg>,

        /// Incentive rate in Rs per eligible acre
        #[arg(long)]
        rate: Option<f64>,

        /// Directory for the output tables
        #[arg(short = 'd', long, default_value = "output")]
        out_dir: PathBuf,

        /// Gzip compress CSV outputs
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// List the fixed season calendar
    Weeks,
    /// Resolve dataset headers without computing anything
    CheckSchema {
        /// Farm registry CSV
        #[arg(long)]
        registry: PathBuf,

        /// Water-level readings CSV
        #[arg(long)]
        readings: Option<PathBuf>,

        /// JSON config file carrying a custom registry schema
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Everything written to `summary.json`.
#[derive(Serialize)]
struct RunReport<'a> {
    status: RunStatus,
    rule: RuleKind,
    config: &'a EngineConfig,
    summary: Summary,
    diagnostics: &'a Diagnostics,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/awd_compliance.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("awd_compliance.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            registry,
            readings,
            config,
            rule,
            periods,
            start,
            end,
            weeks,
            groups,
            rollups,
            participation,
            rate,
            out_dir,
            gzip,
        } => {
            let mut config = match (config, rule, periods) {
                (Some(path), _, _) => EngineConfig::load(&path)?,
                (None, Some(rule), Some(periods)) => EngineConfig::new(periods.into(), rule.into()),
                (None, _, _) => bail!("--rule and --periods are required without --config"),
            };
            if let Some(rule) = rule {
                config.compliance_rule = rule.into();
            }
            if let Some(periods) = periods {
                config.period_strategy = periods.into();
            }
            if start.is_some() {
                config.analysis_start = start;
            }
            if end.is_some() {
                config.analysis_end = end;
            }
            if !weeks.is_empty() {
                config.weeks = weeks.clone();
            }
            if let Some(participation) = participation {
                config.participation = participation.into();
            }
            if let Some(rate) = rate {
                config.rate_per_acre = rate;
            }

            let rollups = if rollups.is_empty() {
                vec![RollupArg::Village, RollupArg::Group, RollupArg::Period]
            } else {
                rollups
            };
            let filter = ResultFilter {
                periods: weeks,
                groups,
            };

            analyze(&registry, &readings, &config, &filter, &rollups, &out_dir, gzip)?;
        }
        Commands::Weeks => {
            for week in season_weeks() {
                info!(
                    week = week.index,
                    start = %week.start,
                    end = %week.end,
                    days = week.days(),
                    label = %week.label(),
                    "Season week"
                );
            }
        }
        Commands::CheckSchema {
            registry,
            readings,
            config,
        } => {
            let schema = match config {
                Some(path) => EngineConfig::load(&path)?.registry_schema,
                None => RegistrySchema::default(),
            };
            check_schema(&registry, readings.as_deref(), &schema)?;
        }
    }

    Ok(())
}

/// Runs the engine over two CSV files and writes every output table.
#[tracing::instrument(skip_all, fields(out_dir = %out_dir.display(), gzip))]
fn analyze(
    registry: &Path,
    readings: &Path,
    config: &EngineConfig,
    filter: &ResultFilter,
    rollups: &[RollupArg],
    out_dir: &Path,
    gzip: bool,
) -> Result<()> {
    let registry = read_table(registry)?;
    let readings = read_table(readings)?;
    let output = compute(&registry, &readings, config)?;
    log_diagnostics(&output.diagnostics);

    if let RunStatus::Empty(reason) = output.status {
        warn!(%reason, "Nothing to score; writing empty tables");
    }

    let results = filter.apply(&output.results);
    std::fs::create_dir_all(out_dir)?;

    let payments: Vec<PaymentRow> = results.iter().map(PaymentRow::from).collect();
    write_records(&out_dir.join("awd_payment_results.csv"), &payments, gzip)?;

    let monitoring: Vec<MonitoringRow> = results.iter().map(MonitoringRow::from).collect();
    write_records(&out_dir.join("awd_monitoring_report.csv"), &monitoring, gzip)?;

    for &arg in rollups {
        let key = RollupKey::from(arg);
        let rows = rollup(&results, key);
        write_records(
            &out_dir.join(format!("awd_rollup_{}.csv", key.name())),
            &rows,
            gzip,
        )?;
    }

    let summary = summarize(&results);
    print_pretty(&summary);
    info!(
        farms = summary.total_farms,
        valid_farm_periods = summary.valid_farm_periods,
        average_compliance = format!("{:.3}", summary.average_compliance),
        total_incentive = summary.total_incentive,
        "Run summary"
    );

    let report = RunReport {
        status: output.status,
        rule: output.rule,
        config,
        summary,
        diagnostics: &output.diagnostics,
    };
    write_json(&out_dir.join("summary.json"), &report)?;

    info!(out_dir = %out_dir.display(), rows = results.len(), "Outputs written");
    Ok(())
}

/// Logs how each expected field resolved. Fails if a required field is missing.
fn check_schema(registry: &Path, readings: Option<&Path>, schema: &RegistrySchema) -> Result<()> {
    let table = read_table(registry)?;
    for (field, header) in schema.describe(&table) {
        match header {
            Some(header) => info!(dataset = "registry", field = %field, header = %header, "Resolved"),
            None => warn!(dataset = "registry", field = %field, "Unresolved"),
        }
    }
    let mut failed = false;
    if let Err(e) = schema.resolve(&table) {
        error!(error = %e, "Registry schema check failed");
        failed = true;
    }

    if let Some(path) = readings {
        let table = read_table(path)?;
        for (field, header) in ReadingColumns::describe(&table) {
            match header {
                Some(header) => info!(dataset = "readings", field = %field, header = %header, "Resolved"),
                None => warn!(dataset = "readings", field = %field, "Unresolved"),
            }
        }
        if let Err(e) = ReadingColumns::resolve(&table) {
            error!(error = %e, "Readings schema check failed");
            failed = true;
        }
    }

    if failed {
        bail!("schema check failed");
    }
    info!("Schema check passed");
    Ok(())
}
