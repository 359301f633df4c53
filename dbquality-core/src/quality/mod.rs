//! Data quality engine.
//!
//! This module provides the quality-check building blocks:
//! - **Outliers**: IQR and z-score detection on numeric columns
//! - **Inference**: expectation suites derived from observed data
//! - **Validation**: suites evaluated against a dataset
//! - **Profiling**: per-column statistics for the HTML report
//!
//! # Example
//! ```rust
//! use dbquality_core::models::{CellValue, Column, Dataset};
//! use dbquality_core::quality::{infer_expectations, validate};
//!
//! let dataset = Dataset::new(
//!     "people",
//!     vec![Column::new("age", vec![CellValue::Integer(20), CellValue::Integer(40)])],
//! );
//! let suite = infer_expectations(&dataset, "people_suite");
//! let result = validate(&dataset, &suite);
//! assert_eq!(result.success_rate(), 1.0);
//! ```

mod config;
mod expectations;
mod inference;
mod outliers;
mod profile;
mod validator;

// Re-export public API
pub use config::{
    ConfigValidationError, DEFAULT_BINARY_DISTINCT_MAX, DEFAULT_CATEGORICAL_LIMIT,
    DEFAULT_PASS_THRESHOLD, InferenceConfig, QualityCheckConfig, StageSelection,
};
pub use expectations::{Expectation, ExpectationSuite, RangeBound};
pub use inference::{ExpectationInferencer, infer_expectations};
pub use outliers::{
    DEFAULT_IQR_FACTOR, FlaggedValue, IqrBounds, OutlierBounds, OutlierError, OutlierMethod,
    OutlierReport, ZScoreBounds, detect_in_dataset, detect_outliers,
};
pub(crate) use outliers::quantile;
pub use profile::{ColumnProfile, DatasetProfile, MOST_COMMON_LIMIT, ValueCount, profile_dataset};
pub use validator::{
    ExpectationOutcome, ObservedSummary, OutcomeException, PARTIAL_UNEXPECTED_LIMIT,
    ValidationResult, ValidationStatistics, validate,
};
