//! Command-line surface for dbquality.
//!
//! The binary in `main.rs` only parses arguments, sets up logging and maps
//! [`CommandStatus`] to a process exit code; everything else lives here so
//! the commands can be driven from tests.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dbquality_core::{
    Dataset, QualityCheckRunner, ReportDir, TabularSource,
    adapters::create_source,
    error::{DbQualityError, redact_database_url},
    persistence::{DEFAULT_REPORT_DIR, load_suite, save_suite, save_validation_result},
    quality::{
        DEFAULT_IQR_FACTOR, DEFAULT_PASS_THRESHOLD, OutlierBounds, OutlierMethod,
        QualityCheckConfig, StageSelection, detect_in_dataset, infer_expectations, validate,
    },
    report::{ChartSink, SvgChartRenderer},
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info};

/// Number of flagged values echoed by the `outliers` command.
pub const SAMPLE_OUTLIERS_SHOWN: usize = 10;

/// Command-line interface.
#[derive(Debug, Parser)]
#[command(name = "dbquality")]
#[command(about = "Data quality checks for relational databases")]
#[command(version)]
#[command(long_about = "
dbquality - profile tables, infer and test expectations, find outliers

COMMANDS:
- profile   HTML profile report per table
- expect    Infer an expectation suite from a table
- test      Validate a table against a saved suite (exit 1 below 90%)
- outliers  IQR or z-score outliers of one numeric column
- run       Full check over all (or selected) tables with a JSON summary

SUPPORTED DATABASES:
- PostgreSQL (postgres:// or postgresql://)
- SQLite (sqlite:// or .db/.sqlite files)

EXAMPLES:
  dbquality --database-url sqlite://./app.db run
  dbquality expect customers --output customers_suite.json
  dbquality test customers --expectations customers_suite.json --output result.json
  dbquality outliers orders amount --method zscore --factor 3
")]
pub struct Cli {
    /// Options shared by every command
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Command to run
    #[command(subcommand)]
    pub command: Command,
}

/// Options accepted before or after any command.
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Database connection URL
    #[arg(
        long,
        env = "DATABASE_URL",
        global = true,
        hide_env_values = true,
        help = "Database connection string (credentials will be sanitized in logs)"
    )]
    pub database_url: Option<String>,

    /// Directory for generated reports
    #[arg(long, global = true, default_value = DEFAULT_REPORT_DIR)]
    pub report_dir: PathBuf,

    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Write an HTML profile report per table
    Profile(ProfileArgs),
    /// Infer an expectation suite from a table
    Expect(ExpectArgs),
    /// Validate a table against a saved expectation suite
    Test(TestArgs),
    /// Detect outliers in one numeric column
    Outliers(OutliersArgs),
    /// Run the full quality check and write a summary
    Run(RunArgs),
}

/// Arguments of `profile`.
#[derive(Debug, Args)]
pub struct ProfileArgs {
    /// Tables to profile (default: all user tables)
    #[arg(long, num_args = 1..)]
    pub tables: Vec<String>,

    /// Maximum rows loaded per table
    #[arg(long)]
    pub limit: Option<u32>,

    /// Output directory (overrides --report-dir)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// Arguments of `expect`.
#[derive(Debug, Args)]
pub struct ExpectArgs {
    /// Table to infer expectations from
    pub table: String,

    /// Output file for the suite
    #[arg(long)]
    pub output: PathBuf,
}

/// Arguments of `test`.
#[derive(Debug, Args)]
pub struct TestArgs {
    /// Table to validate
    pub table: String,

    /// Saved expectation suite
    #[arg(long)]
    pub expectations: PathBuf,

    /// Output file for the validation result
    #[arg(long)]
    pub output: PathBuf,
}

/// Arguments of `outliers`.
#[derive(Debug, Args)]
pub struct OutliersArgs {
    /// Table holding the column
    pub table: String,

    /// Numeric column to analyze
    pub column: String,

    /// Detection method: iqr or zscore
    #[arg(long, default_value = "iqr")]
    pub method: OutlierMethod,

    /// IQR multiplier (default 1.5) or z-score threshold (required)
    #[arg(long)]
    pub factor: Option<f64>,
}

/// Arguments of `run`.
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Table to check; repeat for several (default: all user tables)
    #[arg(long = "table")]
    pub tables: Vec<String>,

    /// Run the profile stage
    #[arg(long)]
    pub profile: bool,

    /// Run the outlier stage
    #[arg(long)]
    pub outliers: bool,

    /// Run the expectation and validation stage
    #[arg(long)]
    pub validate: bool,

    /// Maximum rows loaded per table
    #[arg(long)]
    pub limit: Option<u32>,

    /// Outlier method for the outlier stage
    #[arg(long, default_value = "iqr")]
    pub method: OutlierMethod,

    /// Outlier factor for the outlier stage
    #[arg(long)]
    pub factor: Option<f64>,
}

/// How a successfully executed command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Command finished
    Success,
    /// `test` finished but the success rate is below the pass threshold
    BelowThreshold,
}

impl CommandStatus {
    /// Process exit code for this status.
    pub fn exit_code(self) -> ExitCode {
        match self {
            Self::Success => ExitCode::SUCCESS,
            Self::BelowThreshold => ExitCode::FAILURE,
        }
    }
}

/// Executes the parsed command.
///
/// # Errors
/// Returns an error when no database URL is configured, the source cannot be
/// opened, or the command itself fails.
pub async fn execute(cli: Cli) -> Result<CommandStatus> {
    let Cli { global, command } = cli;
    let database_url = require_database_url(global.database_url.as_deref())?;

    info!("Target: {}", redact_database_url(database_url));
    let source = create_source(database_url)
        .await
        .context("Failed to open data source")?;
    debug!("Opened {} source", source.source_type());

    match command {
        Command::Profile(args) => profile(source.as_ref(), &global.report_dir, args).await,
        Command::Expect(args) => expect(source.as_ref(), args).await,
        Command::Test(args) => test_table(source.as_ref(), args).await,
        Command::Outliers(args) => outliers(source.as_ref(), &global.report_dir, args).await,
        Command::Run(args) => run(source.as_ref(), &global.report_dir, args).await,
    }
}

/// Returns the configured database URL or a configuration error.
pub fn require_database_url(database_url: Option<&str>) -> dbquality_core::Result<&str> {
    database_url.filter(|url| !url.trim().is_empty()).ok_or_else(|| {
        DbQualityError::configuration(
            "Database URL is required: pass --database-url or set DATABASE_URL",
        )
    })
}

async fn load(source: &dyn TabularSource, table: &str) -> Result<Dataset> {
    source
        .load_table(table, None)
        .await
        .with_context(|| format!("Failed to load table '{}'", table))
}

async fn profile(
    source: &dyn TabularSource,
    report_dir: &std::path::Path,
    args: ProfileArgs,
) -> Result<CommandStatus> {
    let root = args.output_dir.unwrap_or_else(|| report_dir.to_path_buf());
    let config = QualityCheckConfig::new().with_row_limit(args.limit);
    config.validate()?;

    let runner = QualityCheckRunner::new(source, config, ReportDir::new(root));
    let tables = (!args.tables.is_empty()).then_some(args.tables);
    let reports = runner.profile_tables(tables).await?;

    for (table, path) in reports.iter() {
        println!("Profile for {} written to {}", table, path.display());
    }
    println!("{} profile reports created", reports.len());
    Ok(CommandStatus::Success)
}

async fn expect(source: &dyn TabularSource, args: ExpectArgs) -> Result<CommandStatus> {
    let dataset = load(source, &args.table).await?;
    let suite = infer_expectations(&dataset, &format!("{}_suite", args.table));
    save_suite(&suite, &args.output).await?;

    println!(
        "Expectation suite for {} ({} expectations) saved to {}",
        args.table,
        suite.len(),
        args.output.display()
    );
    Ok(CommandStatus::Success)
}

async fn test_table(source: &dyn TabularSource, args: TestArgs) -> Result<CommandStatus> {
    let suite = load_suite(&args.expectations)
        .await
        .with_context(|| format!("Failed to read suite {}", args.expectations.display()))?;
    let dataset = load(source, &args.table).await?;

    let result = validate(&dataset, &suite);
    save_validation_result(&result, &args.output).await?;

    for failure in result.failures() {
        println!(
            "  FAILED {} ({} unexpected)",
            failure.expectation, failure.result.unexpected_count
        );
    }
    println!("Success rate: {:.2}%", result.success_rate() * 100.0);

    if result.meets_threshold(DEFAULT_PASS_THRESHOLD) {
        Ok(CommandStatus::Success)
    } else {
        println!(
            "Below the {:.0}% pass threshold",
            DEFAULT_PASS_THRESHOLD * 100.0
        );
        Ok(CommandStatus::BelowThreshold)
    }
}

/// Factor for the `outliers` command: IQR falls back to 1.5, z-score must be given.
pub fn outlier_factor(method: OutlierMethod, factor: Option<f64>) -> dbquality_core::Result<f64> {
    match (method, factor) {
        (_, Some(factor)) => Ok(factor),
        (OutlierMethod::Iqr, None) => Ok(DEFAULT_IQR_FACTOR),
        (OutlierMethod::ZScore, None) => Err(DbQualityError::configuration(
            "--factor is required for the zscore method",
        )),
    }
}

async fn outliers(
    source: &dyn TabularSource,
    report_dir: &std::path::Path,
    args: OutliersArgs,
) -> Result<CommandStatus> {
    let factor = outlier_factor(args.method, args.factor)?;
    let dataset = load(source, &args.table).await?;
    let report = detect_in_dataset(&dataset, &args.column, args.method, factor)?;

    let report_dir = ReportDir::new(report_dir);
    report_dir.ensure_exists().await?;
    let chart = report_dir.outlier_chart_path(&args.table, &args.column);
    let values: Vec<f64> = dataset
        .column(&args.column)
        .map(|c| c.numeric_values().into_iter().map(|(_, v)| v).collect())
        .unwrap_or_default();
    SvgChartRenderer::new()
        .write_outlier_chart(&report, &values, &chart)
        .await?;

    println!("Outliers found: {}", report.outlier_count());
    match &report.bounds {
        OutlierBounds::Iqr(b) => println!(
            "Bounds: lower={} upper={} Q1={} Q3={} IQR={}",
            b.lower, b.upper, b.q1, b.q3, b.iqr
        ),
        OutlierBounds::ZScore(b) => println!(
            "Bounds: mean={} std={} threshold={}",
            b.mean, b.std, b.threshold
        ),
    }
    println!("Chart saved to {}", chart.display());

    if !report.outliers.is_empty() {
        println!("\nSample outliers:");
        for flagged in report.outliers.iter().take(SAMPLE_OUTLIERS_SHOWN) {
            println!("  row {}: {}", flagged.row_index, flagged.value);
        }
    }
    Ok(CommandStatus::Success)
}

async fn run(
    source: &dyn TabularSource,
    report_dir: &std::path::Path,
    args: RunArgs,
) -> Result<CommandStatus> {
    let config = QualityCheckConfig::new()
        .with_stages(StageSelection {
            profile: args.profile,
            outliers: args.outliers,
            validate: args.validate,
        })
        .with_row_limit(args.limit)
        .with_outlier_method(args.method, args.factor);

    let runner = QualityCheckRunner::new(source, config, ReportDir::new(report_dir));
    let tables = (!args.tables.is_empty()).then_some(args.tables);
    let report = runner.run(tables).await?;

    for (table, summary) in report.summary.tables.iter() {
        match &summary.error {
            Some(error) => println!("  {}: error: {}", table, error),
            None => {
                let validation = summary
                    .validation
                    .as_ref()
                    .map(|v| format!(", {:.1}% expectations met", v.success_percent))
                    .unwrap_or_default();
                println!("  {}: ok{}", table, validation);
            }
        }
    }
    println!("Quality check summary saved to {}", report.summary_path.display());
    debug!(
        "Run {} summary: {}",
        report.summary.run_id,
        serde_json::to_string(&report.summary).unwrap_or_default()
    );
    Ok(CommandStatus::Success)
}
