//! Validation of datasets against expectation suites.
//!
//! Every expectation yields exactly one outcome. A rule whose column is
//! missing from the dataset fails with [`OutcomeException::MissingColumn`]
//! instead of aborting the run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{CellValue, Column, Dataset};

use super::expectations::{Expectation, ExpectationSuite, RangeBound};

/// Maximum number of offending values kept per outcome.
pub const PARTIAL_UNEXPECTED_LIMIT: usize = 20;

/// Observed statistics behind one outcome.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ObservedSummary {
    /// Rows in the column
    pub element_count: usize,
    /// Null cells
    pub missing_count: usize,
    /// Cells that broke the rule
    pub unexpected_count: usize,
    /// `unexpected_count` as a percentage of non-null cells
    pub unexpected_percent: f64,
    /// First offending values (empty for `not_null`)
    pub partial_unexpected_list: Vec<CellValue>,
    /// Row indices of the first offending cells
    pub partial_unexpected_index_list: Vec<usize>,
    /// Smallest observed value, for range rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_min: Option<CellValue>,
    /// Largest observed value, for range rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_max: Option<CellValue>,
}

/// Reason an expectation could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutcomeException {
    /// The dataset has no column with this name
    MissingColumn {
        /// Column named by the expectation
        column: String,
    },
}

impl std::fmt::Display for OutcomeException {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingColumn { column } => write!(f, "column '{}' not found", column),
        }
    }
}

/// Result of evaluating one expectation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationOutcome {
    /// The evaluated rule
    pub expectation: Expectation,
    /// Whether every non-null value satisfied it
    pub success: bool,
    /// What was observed
    pub result: ObservedSummary,
    /// Set when the rule could not be evaluated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<OutcomeException>,
}

/// Aggregate counts over a validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationStatistics {
    /// Expectations in the suite
    pub evaluated_expectations: usize,
    /// Expectations that succeeded
    pub successful_expectations: usize,
    /// Expectations that failed
    pub unsuccessful_expectations: usize,
    /// Success rate times 100
    pub success_percent: f64,
}

/// Outcome of validating one dataset against one suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Suite that was validated
    pub suite_name: String,
    /// True when every expectation succeeded
    pub success: bool,
    /// Aggregate counts
    pub statistics: ValidationStatistics,
    /// One outcome per expectation, in suite order
    pub results: Vec<ExpectationOutcome>,
    /// When validation ran
    pub validated_at: DateTime<Utc>,
}

impl ValidationResult {
    /// Fraction of successful expectations; 1.0 for an empty suite.
    pub fn success_rate(&self) -> f64 {
        match self.statistics.evaluated_expectations {
            0 => 1.0,
            evaluated => self.statistics.successful_expectations as f64 / evaluated as f64,
        }
    }

    /// Returns true when the success rate reaches `threshold`.
    pub fn meets_threshold(&self, threshold: f64) -> bool {
        self.success_rate() >= threshold
    }

    /// Outcomes that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &ExpectationOutcome> {
        self.results.iter().filter(|r| !r.success)
    }
}

/// Evaluates every expectation of `suite` against `dataset`, in order.
pub fn validate(dataset: &Dataset, suite: &ExpectationSuite) -> ValidationResult {
    let results: Vec<ExpectationOutcome> = suite
        .expectations
        .iter()
        .map(|expectation| evaluate(dataset, expectation))
        .collect();

    let evaluated = results.len();
    let successful = results.iter().filter(|r| r.success).count();
    let success_percent = if evaluated == 0 {
        100.0
    } else {
        successful as f64 / evaluated as f64 * 100.0
    };

    tracing::debug!(
        "Validated '{}' against '{}': {}/{} expectations met",
        dataset.name,
        suite.suite_name,
        successful,
        evaluated
    );

    ValidationResult {
        suite_name: suite.suite_name.clone(),
        success: successful == evaluated,
        statistics: ValidationStatistics {
            evaluated_expectations: evaluated,
            successful_expectations: successful,
            unsuccessful_expectations: evaluated - successful,
            success_percent,
        },
        results,
        validated_at: Utc::now(),
    }
}

fn evaluate(dataset: &Dataset, expectation: &Expectation) -> ExpectationOutcome {
    let Some(column) = dataset.column(expectation.column()) else {
        tracing::warn!(
            "Expectation '{}' references missing column '{}'",
            expectation.kind_name(),
            expectation.column()
        );
        return ExpectationOutcome {
            expectation: expectation.clone(),
            success: false,
            result: ObservedSummary::default(),
            exception: Some(OutcomeException::MissingColumn {
                column: expectation.column().to_string(),
            }),
        };
    };

    let result = match expectation {
        Expectation::NotNull { .. } => not_null_summary(column),
        Expectation::ValueRange { min, max, .. } => {
            let mut summary = summarize(column, |value| within(value, min, max));
            let (observed_min, observed_max) = observed_range(column, min);
            summary.observed_min = observed_min;
            summary.observed_max = observed_max;
            summary
        }
        Expectation::ValueInSet { allowed_values, .. } => {
            let allowed: HashSet<String> =
                allowed_values.iter().filter_map(CellValue::match_key).collect();
            summarize(column, |value| {
                value.match_key().is_some_and(|key| allowed.contains(&key))
            })
        }
    };

    ExpectationOutcome {
        expectation: expectation.clone(),
        success: result.unexpected_count == 0,
        result,
        exception: None,
    }
}

fn not_null_summary(column: &Column) -> ObservedSummary {
    let missing: Vec<usize> = column
        .values
        .iter()
        .enumerate()
        .filter(|(_, v)| v.is_null())
        .map(|(row, _)| row)
        .collect();

    ObservedSummary {
        element_count: column.len(),
        missing_count: missing.len(),
        unexpected_count: missing.len(),
        unexpected_percent: percent(missing.len(), column.len()),
        partial_unexpected_list: Vec::new(),
        partial_unexpected_index_list: missing.into_iter().take(PARTIAL_UNEXPECTED_LIMIT).collect(),
        observed_min: None,
        observed_max: None,
    }
}

/// Counts non-null cells rejected by `accepts`.
fn summarize(column: &Column, accepts: impl Fn(&CellValue) -> bool) -> ObservedSummary {
    let missing_count = column.null_count();
    let mut summary = ObservedSummary {
        element_count: column.len(),
        missing_count,
        ..Default::default()
    };

    for (row, value) in column.values.iter().enumerate() {
        if value.is_null() || accepts(value) {
            continue;
        }
        summary.unexpected_count += 1;
        if summary.partial_unexpected_list.len() < PARTIAL_UNEXPECTED_LIMIT {
            summary.partial_unexpected_list.push(value.clone());
            summary.partial_unexpected_index_list.push(row);
        }
    }

    summary.unexpected_percent = percent(summary.unexpected_count, column.len() - missing_count);
    summary
}

/// Inclusive bound check; cells not comparable with the bound type fail.
fn within(value: &CellValue, min: &RangeBound, max: &RangeBound) -> bool {
    match (min, max) {
        (RangeBound::Numeric(lo), RangeBound::Numeric(hi)) => {
            value.as_f64().is_some_and(|v| *lo <= v && v <= *hi)
        }
        (RangeBound::Temporal(lo), RangeBound::Temporal(hi)) => {
            value.as_timestamp().is_some_and(|ts| *lo <= ts && ts <= *hi)
        }
        _ => false,
    }
}

fn observed_range(column: &Column, bound: &RangeBound) -> (Option<CellValue>, Option<CellValue>) {
    match bound {
        RangeBound::Numeric(_) => column
            .numeric_range()
            .map(|(lo, hi)| (Some(CellValue::from_f64(lo)), Some(CellValue::from_f64(hi))))
            .unwrap_or_default(),
        RangeBound::Temporal(_) => column
            .temporal_range()
            .map(|(lo, hi)| (Some(CellValue::Timestamp(lo)), Some(CellValue::Timestamp(hi))))
            .unwrap_or_default(),
    }
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
