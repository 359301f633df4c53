//! Column statistics for the profiling report.
//!
//! Missing ratios are fractions in `[0.0, 1.0]`, matching what the run
//! summary records under `missing_percent`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{CellValue, Column, ColumnType, DataKind, Dataset};

/// Number of most frequent values kept per column.
pub const MOST_COMMON_LIMIT: usize = 5;

/// A value and how often it occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    /// The value
    pub value: CellValue,
    /// Occurrences among non-null cells
    pub count: usize,
}

/// Statistics for one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    /// Column name
    pub name: String,
    /// Inference column type
    pub column_type: ColumnType,
    /// Storage kind
    pub kind: DataKind,
    /// Non-null cells
    pub count: usize,
    /// Null cells
    pub missing: usize,
    /// Fraction of null cells
    pub missing_percent: f64,
    /// Distinct non-null values
    pub distinct: usize,
    /// Smallest value, numeric and temporal columns only
    pub min: Option<CellValue>,
    /// Largest value, numeric and temporal columns only
    pub max: Option<CellValue>,
    /// Mean of numeric values
    pub mean: Option<f64>,
    /// Sample standard deviation of numeric values
    pub std: Option<f64>,
    /// Most frequent values, most frequent first
    pub most_common: Vec<ValueCount>,
}

/// Statistics for a whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    /// Dataset name
    pub name: String,
    /// Rows
    pub observations: usize,
    /// Columns
    pub variables: usize,
    /// Null cells across all columns
    pub missing_cells: usize,
    /// Fraction of null cells across all columns
    pub missing_percent: f64,
    /// Per-column statistics in dataset order
    pub columns: Vec<ColumnProfile>,
    /// When the profile was computed
    pub generated_at: DateTime<Utc>,
}

/// Profiles every column of `dataset`.
pub fn profile_dataset(dataset: &Dataset, categorical_limit: usize) -> DatasetProfile {
    let observations = dataset.row_count();
    let variables = dataset.column_count();
    let missing_cells = dataset.missing_cells();
    let total_cells = observations * variables;

    DatasetProfile {
        name: dataset.name.clone(),
        observations,
        variables,
        missing_cells,
        missing_percent: fraction(missing_cells, total_cells),
        columns: dataset
            .columns
            .iter()
            .map(|column| profile_column(column, categorical_limit))
            .collect(),
        generated_at: Utc::now(),
    }
}

fn profile_column(column: &Column, categorical_limit: usize) -> ColumnProfile {
    let missing = column.null_count();
    let column_type = column.column_type(categorical_limit);

    let (min, max) = match column.kind {
        DataKind::Numeric => column
            .numeric_range()
            .map(|(lo, hi)| (Some(CellValue::from_f64(lo)), Some(CellValue::from_f64(hi))))
            .unwrap_or_default(),
        DataKind::Temporal => column
            .temporal_range()
            .map(|(lo, hi)| (Some(CellValue::Timestamp(lo)), Some(CellValue::Timestamp(hi))))
            .unwrap_or_default(),
        _ => (None, None),
    };

    let (mean, std) = if column.is_numeric() {
        mean_and_std(column)
    } else {
        (None, None)
    };

    ColumnProfile {
        name: column.name.clone(),
        column_type,
        kind: column.kind,
        count: column.len() - missing,
        missing,
        missing_percent: fraction(missing, column.len()),
        distinct: column.distinct_count(),
        min,
        max,
        mean,
        std,
        most_common: most_common(column),
    }
}

fn mean_and_std(column: &Column) -> (Option<f64>, Option<f64>) {
    let values: Vec<f64> = column.numeric_values().into_iter().map(|(_, v)| v).collect();
    if values.is_empty() {
        return (None, None);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std = (values.len() > 1).then(|| {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
    });
    (Some(mean), std.filter(|s| s.is_finite()))
}

/// Most frequent values, ties broken by first appearance.
fn most_common(column: &Column) -> Vec<ValueCount> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for key in column.non_null().filter_map(CellValue::match_key) {
        *counts.entry(key).or_default() += 1;
    }

    let mut ranked: Vec<ValueCount> = column
        .distinct_non_null()
        .into_iter()
        .filter_map(|value| {
            let count = value.match_key().and_then(|key| counts.get(&key).copied())?;
            Some(ValueCount { value, count })
        })
        .collect();
    // Stable sort keeps first-seen order among equal counts
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(MOST_COMMON_LIMIT);
    ranked
}

fn fraction(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}
