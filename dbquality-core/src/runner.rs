//! Quality-check orchestration.
//!
//! A run walks the selected tables one at a time:
//! `load -> profile? -> outliers? -> validate?`. A failing stage stops that
//! table only; its error lands in the summary and the next table starts.
//! Configuration errors abort before any table is loaded.

use std::path::PathBuf;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::adapters::{TabularSource, is_system_table};
use crate::error::DbQualityError;
use crate::models::Dataset;
use crate::persistence::{ReportDir, save_suite, save_summary, save_validation_result};
use crate::quality::{
    ExpectationInferencer, OutlierMethod, QualityCheckConfig, StageSelection, detect_outliers,
    profile_dataset, validate,
};
use crate::report::{ChartSink, HtmlProfileReporter, ProfileReporter, SvgChartRenderer};
use crate::summary::{
    ColumnOutlierEntry, OrderedMap, OutlierStageSummary, ProfileSummary, QualityCheckSummary,
    TableSummary, ValidationSummary,
};

/// Result of processing one table.
#[derive(Debug)]
pub enum TableOutcome {
    /// Every selected stage finished
    Completed(TableSummary),
    /// A stage failed; `partial` holds what finished before it
    Failed {
        partial: TableSummary,
        error: DbQualityError,
    },
}

impl TableOutcome {
    /// Returns true when every selected stage finished.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Folds the outcome into the summary record, error text included.
    pub fn into_summary(self) -> TableSummary {
        match self {
            Self::Completed(summary) => summary,
            Self::Failed { mut partial, error } => {
                partial.error = Some(error.to_string());
                partial
            }
        }
    }
}

/// Summary of a finished run and where it was written.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Per-table records
    pub summary: QualityCheckSummary,
    /// File the summary was saved to
    pub summary_path: PathBuf,
}

/// Runs quality checks against one source.
pub struct QualityCheckRunner<'a> {
    source: &'a dyn TabularSource,
    config: QualityCheckConfig,
    report_dir: ReportDir,
    profile_reporter: Box<dyn ProfileReporter>,
    chart_sink: Option<Box<dyn ChartSink>>,
}

impl<'a> QualityCheckRunner<'a> {
    /// Creates a runner with the HTML profile reporter and SVG charts.
    pub fn new(source: &'a dyn TabularSource, config: QualityCheckConfig, report_dir: ReportDir) -> Self {
        Self {
            source,
            config,
            report_dir,
            profile_reporter: Box::new(HtmlProfileReporter::new()),
            chart_sink: Some(Box::new(SvgChartRenderer::new())),
        }
    }

    /// Builder method to replace the profile reporter.
    pub fn with_profile_reporter(mut self, reporter: Box<dyn ProfileReporter>) -> Self {
        self.profile_reporter = reporter;
        self
    }

    /// Builder method to replace the chart sink; `None` disables charts.
    pub fn with_chart_sink(mut self, sink: Option<Box<dyn ChartSink>>) -> Self {
        self.chart_sink = sink;
        self
    }

    /// Configuration this runner was built with.
    pub fn config(&self) -> &QualityCheckConfig {
        &self.config
    }

    /// Directory artifacts are written to.
    pub fn report_dir(&self) -> &ReportDir {
        &self.report_dir
    }

    /// Runs every selected stage on `tables`, or on all user tables when
    /// `tables` is `None`, and writes the run summary.
    ///
    /// # Errors
    /// Fails on invalid configuration, an unusable report directory, or when
    /// the table list cannot be read. Per-table failures are recorded in the
    /// summary instead.
    pub async fn run(&self, tables: Option<Vec<String>>) -> Result<RunReport> {
        self.config.validate()?;
        let factor = self.config.effective_factor()?;
        let stages = self.config.effective_stages();
        self.report_dir.ensure_exists().await?;

        let tables = self.resolve_tables(tables).await?;
        info!(
            "Checking {} tables (profile: {}, outliers: {}, validate: {})",
            tables.len(),
            stages.profile,
            stages.outliers,
            stages.validate
        );

        let mut summary = QualityCheckSummary::new();
        for table in &tables {
            info!("Processing table {}", table);
            let outcome = self.check_table(table, stages, factor).await;
            if let TableOutcome::Failed { error, .. } = &outcome {
                error!("Table {} failed: {}", table, error);
            }
            summary.record(table.clone(), outcome.into_summary());
        }

        let summary_path = self.report_dir.summary_path();
        save_summary(&summary, &summary_path).await?;
        info!(
            "Quality check finished: {} tables, {} failed",
            summary.tables.len(),
            summary.failed_tables().len()
        );

        Ok(RunReport {
            summary,
            summary_path,
        })
    }

    /// Writes an HTML profile for each table and returns the report paths.
    ///
    /// Tables that fail to load or render are logged and left out.
    pub async fn profile_tables(&self, tables: Option<Vec<String>>) -> Result<OrderedMap<PathBuf>> {
        self.report_dir.ensure_exists().await?;
        let mut reports = OrderedMap::new();

        for table in self.resolve_tables(tables).await? {
            info!("Profiling table {}", table);
            match self.load(&table).await {
                Ok(dataset) => match self.profile_stage(&table, &dataset).await {
                    Ok(profile) => {
                        reports.insert(table, PathBuf::from(profile.file));
                    }
                    Err(e) => error!("Failed to profile {}: {}", table, e),
                },
                Err(e) => error!("Failed to load {}: {}", table, e),
            }
        }

        Ok(reports)
    }

    /// Runs the selected stages on one table.
    pub async fn check_table(&self, table: &str, stages: StageSelection, factor: f64) -> TableOutcome {
        let mut summary = TableSummary::default();

        let dataset = match self.load(table).await {
            Ok(dataset) => dataset,
            Err(error) => {
                return TableOutcome::Failed {
                    partial: summary,
                    error,
                };
            }
        };

        if stages.profile {
            match self.profile_stage(table, &dataset).await {
                Ok(profile) => summary.profile = Some(profile),
                Err(error) => {
                    return TableOutcome::Failed {
                        partial: summary,
                        error,
                    };
                }
            }
        }

        if stages.outliers {
            summary.outliers = Some(
                self.outlier_stage(table, &dataset, self.config.outlier_method, factor)
                    .await,
            );
        }

        if stages.validate {
            match self.validation_stage(table, &dataset).await {
                Ok(validation) => summary.validation = Some(validation),
                Err(error) => {
                    return TableOutcome::Failed {
                        partial: summary,
                        error,
                    };
                }
            }
        }

        TableOutcome::Completed(summary)
    }

    async fn resolve_tables(&self, tables: Option<Vec<String>>) -> Result<Vec<String>> {
        if let Some(tables) = tables.filter(|t| !t.is_empty()) {
            return Ok(tables);
        }
        let all = self.source.list_tables().await?;
        let total = all.len();
        let user_tables: Vec<String> = all.into_iter().filter(|t| !is_system_table(t)).collect();
        if user_tables.len() < total {
            debug!("Skipped {} system tables", total - user_tables.len());
        }
        if user_tables.is_empty() {
            warn!("No user tables found in {} source", self.source.source_type());
        }
        Ok(user_tables)
    }

    async fn load(&self, table: &str) -> Result<Dataset> {
        let dataset = self.source.load_table(table, self.config.row_limit).await?;
        debug!(
            "Loaded {} rows x {} columns from {}",
            dataset.row_count(),
            dataset.column_count(),
            table
        );
        Ok(dataset)
    }

    async fn profile_stage(&self, table: &str, dataset: &Dataset) -> Result<ProfileSummary> {
        let profile = profile_dataset(dataset, self.config.inference.categorical_limit);
        let path = self.report_dir.profile_path(table);
        self.profile_reporter
            .write_profile(&profile, &format!("Data Profile: {}", table), &path)
            .await?;
        info!("Profile for {} written to {}", table, path.display());
        Ok(ProfileSummary::new(&profile, path.display().to_string()))
    }

    async fn outlier_stage(
        &self,
        table: &str,
        dataset: &Dataset,
        method: OutlierMethod,
        factor: f64,
    ) -> OutlierStageSummary {
        let numeric: Vec<_> = dataset.numeric_columns().collect();
        if numeric.is_empty() {
            info!("No numeric columns in {}", table);
            return OutlierStageSummary::no_numeric_columns();
        }

        let total_rows = dataset.row_count();
        let mut columns = OrderedMap::new();
        for column in numeric {
            if column.distinct_count() <= self.config.binary_distinct_max {
                debug!("Skipping binary column {}.{}", table, column.name);
                continue;
            }

            let report = match detect_outliers(column, method, factor) {
                Ok(report) => report,
                Err(e) => {
                    warn!("Outlier detection failed for {}.{}: {}", table, column.name, e);
                    columns.insert(
                        column.name.clone(),
                        ColumnOutlierEntry::Failed {
                            error: e.to_string(),
                        },
                    );
                    continue;
                }
            };

            let chart = match &self.chart_sink {
                Some(sink) => {
                    let path = self.report_dir.outlier_chart_path(table, &column.name);
                    let values: Vec<f64> = column.numeric_values().into_iter().map(|(_, v)| v).collect();
                    if let Err(e) = sink.write_outlier_chart(&report, &values, &path).await {
                        warn!("Chart for {}.{} failed: {}", table, column.name, e);
                        columns.insert(
                            column.name.clone(),
                            ColumnOutlierEntry::Failed {
                                error: e.to_string(),
                            },
                        );
                        continue;
                    }
                    Some(path.display().to_string())
                }
                None => None,
            };

            info!(
                "{}.{}: {} outliers ({})",
                table,
                column.name,
                report.outlier_count(),
                method
            );
            columns.insert(
                column.name.clone(),
                ColumnOutlierEntry::Analyzed {
                    count: report.outlier_count(),
                    percent: report.outlier_percent(total_rows),
                    bounds: report.bounds,
                    chart,
                },
            );
        }

        OutlierStageSummary::Columns(columns)
    }

    async fn validation_stage(&self, table: &str, dataset: &Dataset) -> Result<ValidationSummary> {
        let suite_name = format!("{}_suite_{}", table, self.report_dir.timestamp());
        let suite = ExpectationInferencer::new(self.config.inference).infer(dataset, &suite_name);

        let expectations_path = self.report_dir.expectations_path(table);
        save_suite(&suite, &expectations_path).await?;

        let result = validate(dataset, &suite);
        let result_path = self.report_dir.validation_path(table);
        save_validation_result(&result, &result_path).await?;

        if !result.meets_threshold(self.config.pass_threshold) {
            warn!(
                "{} passed {:.1}% of expectations, below {:.0}%",
                table,
                result.success_rate() * 100.0,
                self.config.pass_threshold * 100.0
            );
        }

        Ok(ValidationSummary::new(
            &result,
            expectations_path.display().to_string(),
            result_path.display().to_string(),
        ))
    }
}
