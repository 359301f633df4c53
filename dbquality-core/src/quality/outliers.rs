//! Outlier detection for numeric columns.
//!
//! Two methods are supported:
//! - **IQR**: values outside `[Q1 - factor*IQR, Q3 + factor*IQR]`, with
//!   quartiles computed by linear interpolation between closest ranks
//! - **Z-score**: values whose distance from the sample mean exceeds
//!   `factor` sample standard deviations
//!
//! Nulls are dropped before any statistic is computed and are never flagged.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::error::DbQualityError;
use crate::models::{Column, DataKind, Dataset};

/// Default IQR multiplier. The z-score method has no default threshold.
pub const DEFAULT_IQR_FACTOR: f64 = 1.5;

/// Outlier detection method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierMethod {
    /// Interquartile range fences
    Iqr,
    /// Absolute z-score threshold
    ZScore,
}

impl FromStr for OutlierMethod {
    type Err = OutlierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(Self::Iqr),
            "zscore" => Ok(Self::ZScore),
            _ => Err(OutlierError::UnsupportedMethod {
                method: s.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Iqr => write!(f, "iqr"),
            Self::ZScore => write!(f, "zscore"),
        }
    }
}

/// Errors raised by outlier detection.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OutlierError {
    /// Column holds values other than numbers
    #[error("cannot detect outliers on non-numeric column '{column}'")]
    NonNumericColumn {
        /// Offending column
        column: String,
    },
    /// Method name is neither `iqr` nor `zscore`
    #[error("unsupported method '{method}', expected 'iqr' or 'zscore'")]
    UnsupportedMethod {
        /// Name as given by the caller
        method: String,
    },
    /// Factor is negative, NaN or infinite
    #[error("outlier factor must be finite and non-negative, got {factor}")]
    InvalidFactor {
        /// Rejected factor
        factor: f64,
    },
}

/// IQR fences and the quartiles they were derived from.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IqrBounds {
    /// Lower fence, `Q1 - factor * IQR`
    pub lower: f64,
    /// Upper fence, `Q3 + factor * IQR`
    pub upper: f64,
    /// 25th percentile
    #[serde(rename = "Q1")]
    pub q1: f64,
    /// 75th percentile
    #[serde(rename = "Q3")]
    pub q3: f64,
    /// `Q3 - Q1`
    #[serde(rename = "IQR")]
    pub iqr: f64,
}

/// Z-score distribution parameters and threshold.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ZScoreBounds {
    /// Sample mean
    pub mean: f64,
    /// Sample standard deviation (n-1)
    pub std: f64,
    /// Absolute z-score above which a value is flagged
    pub threshold: f64,
}

/// Method-specific bounds record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutlierBounds {
    /// Fences from the IQR method
    Iqr(IqrBounds),
    /// Parameters from the z-score method
    ZScore(ZScoreBounds),
}

/// A value flagged as an outlier and the row it came from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlaggedValue {
    /// Zero-based row in the loaded dataset
    pub row_index: usize,
    /// The flagged value
    pub value: f64,
}

/// Outcome of outlier detection on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierReport {
    /// Analyzed column
    pub column: String,
    /// Method used
    pub method: OutlierMethod,
    /// IQR multiplier or z-score threshold
    pub factor: f64,
    /// Non-null values that entered the statistics
    pub values_analyzed: usize,
    /// Flagged values in row order
    pub outliers: Vec<FlaggedValue>,
    /// Method-specific bounds
    pub bounds: OutlierBounds,
    /// Per-value absolute z-scores in row order (z-score method only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub z_scores: Vec<f64>,
}

impl OutlierReport {
    /// Number of flagged values.
    pub fn outlier_count(&self) -> usize {
        self.outliers.len()
    }

    /// Flagged values as a percentage of `total_rows`.
    pub fn outlier_percent(&self, total_rows: usize) -> f64 {
        if total_rows == 0 {
            0.0
        } else {
            self.outliers.len() as f64 / total_rows as f64 * 100.0
        }
    }

    /// Flagged values in row order.
    pub fn outlier_values(&self) -> Vec<f64> {
        self.outliers.iter().map(|o| o.value).collect()
    }
}

/// Detects outliers in one numeric column.
///
/// # Errors
/// Returns [`OutlierError::NonNumericColumn`] when the column holds
/// non-numeric data and [`OutlierError::InvalidFactor`] for a negative or
/// non-finite factor.
pub fn detect_outliers(
    column: &Column,
    method: OutlierMethod,
    factor: f64,
) -> Result<OutlierReport, OutlierError> {
    if !factor.is_finite() || factor < 0.0 {
        return Err(OutlierError::InvalidFactor { factor });
    }

    let values = column.numeric_values();
    let numeric = column.kind == DataKind::Numeric
        || (column.kind == DataKind::Unknown && column.non_null().next().is_none());
    if !numeric {
        return Err(OutlierError::NonNumericColumn {
            column: column.name.clone(),
        });
    }

    let (outliers, bounds, z_scores) = match method {
        OutlierMethod::Iqr => {
            let (outliers, bounds) = iqr_outliers(&values, factor);
            (outliers, OutlierBounds::Iqr(bounds), Vec::new())
        }
        OutlierMethod::ZScore => {
            let (outliers, bounds, z_scores) = zscore_outliers(&values, factor);
            (outliers, OutlierBounds::ZScore(bounds), z_scores)
        }
    };

    tracing::debug!(
        "Column '{}': {} of {} values flagged by {}",
        column.name,
        outliers.len(),
        values.len(),
        method
    );

    Ok(OutlierReport {
        column: column.name.clone(),
        method,
        factor,
        values_analyzed: values.len(),
        outliers,
        bounds,
        z_scores,
    })
}

/// Looks up `column` in `dataset` and runs [`detect_outliers`] on it.
pub fn detect_in_dataset(
    dataset: &Dataset,
    column: &str,
    method: OutlierMethod,
    factor: f64,
) -> crate::Result<OutlierReport> {
    let target = dataset
        .column(column)
        .ok_or_else(|| DbQualityError::column_not_found(&dataset.name, column))?;
    Ok(detect_outliers(target, method, factor)?)
}

/// Quantile of pre-sorted values using linear interpolation between ranks.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let position = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lower = position.floor() as usize;
            let upper = position.ceil() as usize;
            let weight = position - lower as f64;
            sorted[lower] + (sorted[upper] - sorted[lower]) * weight
        }
    }
}

fn iqr_outliers(values: &[(usize, f64)], factor: f64) -> (Vec<FlaggedValue>, IqrBounds) {
    if values.is_empty() {
        return (Vec::new(), IqrBounds::default());
    }

    let mut sorted: Vec<f64> = values.iter().map(|(_, v)| *v).collect();
    sorted.sort_by(f64::total_cmp);

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;
    let bounds = IqrBounds {
        lower: q1 - factor * iqr,
        upper: q3 + factor * iqr,
        q1,
        q3,
        iqr,
    };

    let outliers = values
        .iter()
        .filter(|(_, v)| *v < bounds.lower || *v > bounds.upper)
        .map(|&(row_index, value)| FlaggedValue { row_index, value })
        .collect();

    (outliers, bounds)
}

fn zscore_outliers(
    values: &[(usize, f64)],
    factor: f64,
) -> (Vec<FlaggedValue>, ZScoreBounds, Vec<f64>) {
    let (mean, std) = sample_statistics(values);
    let bounds = ZScoreBounds {
        mean,
        std,
        threshold: factor,
    };

    // Constant columns and single values have no spread to measure against
    if std == 0.0 {
        return (Vec::new(), bounds, vec![0.0; values.len()]);
    }

    let z_scores: Vec<f64> = values.iter().map(|(_, v)| (v - mean).abs() / std).collect();
    let outliers = values
        .iter()
        .zip(&z_scores)
        .filter(|(_, z)| **z > factor)
        .map(|(&(row_index, value), _)| FlaggedValue { row_index, value })
        .collect();

    (outliers, bounds, z_scores)
}

/// Mean and sample standard deviation (n-1).
///
/// Fewer than two values, or values that are all equal, give 0 std and the
/// exact observed value as the mean.
fn sample_statistics(values: &[(usize, f64)]) -> (f64, f64) {
    let Some(&(_, first)) = values.first() else {
        return (0.0, 0.0);
    };
    // Summing equal floats can drift, so constancy is read off the data
    if values.iter().all(|(_, v)| *v == first) {
        return (first, 0.0);
    }

    let n = values.len() as f64;
    let mean = values.iter().map(|(_, v)| v).sum::<f64>() / n;

    let variance = values.iter().map(|(_, v)| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    if std.is_finite() { (mean, std) } else { (mean, 0.0) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;
    use proptest::prelude::*;

    fn numeric_column(values: &[Option<f64>]) -> Column {
        Column::with_kind(
            "value",
            DataKind::Numeric,
            values
                .iter()
                .map(|v| v.map_or(CellValue::Null, CellValue::Float))
                .collect(),
        )
    }

    fn ints(values: &[i64]) -> Column {
        Column::new("age", values.iter().map(|v| CellValue::Integer(*v)).collect())
    }

    #[test]
    fn test_quantile_interpolation() {
        let sorted = [20.0, 21.0, 22.0, 23.0, 1000.0];
        assert_eq!(quantile(&sorted, 0.25), 21.0);
        assert_eq!(quantile(&sorted, 0.5), 22.0);
        assert_eq!(quantile(&sorted, 0.75), 23.0);

        let even = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile(&even, 0.25), 1.75);
        assert_eq!(quantile(&even, 0.75), 3.25);
        assert_eq!(quantile(&[], 0.5), 0.0);
    }

    #[test]
    fn test_iqr_flags_extreme_age() {
        let report = detect_outliers(&ints(&[20, 21, 22, 23, 1000]), OutlierMethod::Iqr, 1.5)
            .unwrap();

        assert_eq!(report.outlier_values(), vec![1000.0]);
        assert_eq!(report.outliers[0].row_index, 4);
        assert_eq!(
            report.bounds,
            OutlierBounds::Iqr(IqrBounds {
                lower: 18.0,
                upper: 26.0,
                q1: 21.0,
                q3: 23.0,
                iqr: 2.0,
            })
        );
        assert!(report.z_scores.is_empty());
    }

    #[test]
    fn test_nulls_are_dropped() {
        let column = numeric_column(&[Some(1.0), None, Some(2.0), None, Some(3.0)]);
        let report = detect_outliers(&column, OutlierMethod::Iqr, 1.5).unwrap();
        assert_eq!(report.values_analyzed, 3);
        assert!(report.outliers.is_empty());
    }

    #[test]
    fn test_constant_column_has_no_outliers() {
        let column = ints(&[7, 7, 7, 7]);
        for factor in [0.0, 0.5, 1.5, 10.0] {
            let iqr = detect_outliers(&column, OutlierMethod::Iqr, factor).unwrap();
            assert!(iqr.outliers.is_empty(), "IQR factor {}", factor);

            let z = detect_outliers(&column, OutlierMethod::ZScore, factor).unwrap();
            assert!(z.outliers.is_empty(), "z-score factor {}", factor);
            assert_eq!(z.z_scores, vec![0.0; 4]);
        }
    }

    #[test]
    fn test_constant_float_column_has_no_outliers() {
        let column = numeric_column(&[Some(0.1), Some(0.1), None, Some(0.1)]);
        for factor in [0.0, 0.5, 1.5] {
            let report = detect_outliers(&column, OutlierMethod::ZScore, factor).unwrap();
            assert!(report.outliers.is_empty(), "z-score factor {}", factor);
            assert_eq!(report.z_scores, vec![0.0; 3]);
            assert_eq!(
                report.bounds,
                OutlierBounds::ZScore(ZScoreBounds {
                    mean: 0.1,
                    std: 0.0,
                    threshold: factor,
                })
            );
        }
    }

    #[test]
    fn test_zscore_uses_sample_std() {
        let report =
            detect_outliers(&ints(&[2, 4, 4, 4, 5, 5, 7, 9]), OutlierMethod::ZScore, 3.0).unwrap();
        let OutlierBounds::ZScore(bounds) = report.bounds else {
            panic!("expected z-score bounds");
        };
        assert_eq!(bounds.mean, 5.0);
        // Sample variance is 32 / 7
        assert!((bounds.std - (32.0f64 / 7.0).sqrt()).abs() < 1e-12);
        assert_eq!(bounds.threshold, 3.0);
        assert_eq!(report.z_scores.len(), 8);
    }

    #[test]
    fn test_zscore_factor_zero_flags_everything_off_mean() {
        let report = detect_outliers(&ints(&[1, 2, 3]), OutlierMethod::ZScore, 0.0).unwrap();
        assert_eq!(report.outlier_values(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_zscore_single_value() {
        let report = detect_outliers(&ints(&[42]), OutlierMethod::ZScore, 1.0).unwrap();
        assert!(report.outliers.is_empty());
        assert_eq!(report.z_scores, vec![0.0]);
    }

    #[test]
    fn test_empty_column_zeroed_bounds() {
        let column = numeric_column(&[None, None]);
        let iqr = detect_outliers(&column, OutlierMethod::Iqr, 1.5).unwrap();
        assert_eq!(iqr.bounds, OutlierBounds::Iqr(IqrBounds::default()));
        assert_eq!(iqr.values_analyzed, 0);

        let z = detect_outliers(&column, OutlierMethod::ZScore, 2.0).unwrap();
        assert_eq!(
            z.bounds,
            OutlierBounds::ZScore(ZScoreBounds {
                mean: 0.0,
                std: 0.0,
                threshold: 2.0,
            })
        );
    }

    #[test]
    fn test_non_numeric_column_rejected() {
        let column = Column::new("name", vec![CellValue::Text("alice".to_string())]);
        let err = detect_outliers(&column, OutlierMethod::Iqr, 1.5).unwrap_err();
        assert!(err.to_string().contains("non-numeric column"));
    }

    #[test]
    fn test_invalid_factor_rejected() {
        let err = detect_outliers(&ints(&[1, 2]), OutlierMethod::Iqr, -1.0).unwrap_err();
        assert!(matches!(err, OutlierError::InvalidFactor { .. }));
    }

    #[test]
    fn test_method_parsing() {
        assert_eq!("iqr".parse::<OutlierMethod>(), Ok(OutlierMethod::Iqr));
        assert_eq!("ZScore".parse::<OutlierMethod>(), Ok(OutlierMethod::ZScore));
        let err = "mad".parse::<OutlierMethod>().unwrap_err();
        assert!(err.to_string().contains("unsupported method"));
        assert_eq!(OutlierMethod::ZScore.to_string(), "zscore");
    }

    #[test]
    fn test_bounds_serialization_keys() {
        let bounds = OutlierBounds::Iqr(IqrBounds {
            lower: 18.0,
            upper: 26.0,
            q1: 21.0,
            q3: 23.0,
            iqr: 2.0,
        });
        let json = serde_json::to_value(bounds).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"lower": 18.0, "upper": 26.0, "Q1": 21.0, "Q3": 23.0, "IQR": 2.0})
        );

        let z: OutlierBounds =
            serde_json::from_value(serde_json::json!({"mean": 1.0, "std": 0.5, "threshold": 3.0}))
                .unwrap();
        assert!(matches!(z, OutlierBounds::ZScore(_)));
    }

    #[test]
    fn test_detect_in_dataset_missing_column() {
        let dataset = Dataset::new("people", vec![ints(&[1, 2, 3])]);
        let err = detect_in_dataset(&dataset, "height", OutlierMethod::Iqr, 1.5).unwrap_err();
        assert!(matches!(err, DbQualityError::ColumnNotFound { .. }));

        let report = detect_in_dataset(&dataset, "age", OutlierMethod::Iqr, 1.5).unwrap();
        assert_eq!(report.column, "age");
    }

    #[test]
    fn test_outlier_percent() {
        let report = detect_outliers(&ints(&[20, 21, 22, 23, 1000]), OutlierMethod::Iqr, 1.5)
            .unwrap();
        assert_eq!(report.outlier_percent(5), 20.0);
        assert_eq!(report.outlier_percent(0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_iqr_bounds_ordered_and_flags_outside(
            values in prop::collection::vec(-1.0e6f64..1.0e6, 1..200),
            factor in 0.0f64..5.0,
        ) {
            let column = numeric_column(&values.iter().copied().map(Some).collect::<Vec<_>>());
            let report = detect_outliers(&column, OutlierMethod::Iqr, factor).unwrap();
            let OutlierBounds::Iqr(bounds) = report.bounds else {
                panic!("expected IQR bounds");
            };

            prop_assert!(bounds.lower <= bounds.q1);
            prop_assert!(bounds.q1 <= bounds.q3);
            prop_assert!(bounds.q3 <= bounds.upper);
            for flagged in &report.outliers {
                prop_assert!(flagged.value < bounds.lower || flagged.value > bounds.upper);
            }
            let inside = values
                .iter()
                .filter(|v| **v >= bounds.lower && **v <= bounds.upper)
                .count();
            prop_assert_eq!(inside + report.outliers.len(), values.len());
        }
    }
}
