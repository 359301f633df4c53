//! Expectation and suite records.
//!
//! Serialized as `{"type": "not_null" | "value_range" | "value_in_set",
//! "column": ..., params...}` so suites can be reviewed and edited by hand.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::models::{CellValue, TIMESTAMP_FORMAT};

/// Inclusive bound of a range expectation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeBound {
    /// Bound for numeric columns
    Numeric(f64),
    /// Bound for temporal columns
    Temporal(NaiveDateTime),
}

impl std::fmt::Display for RangeBound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Numeric(v) => write!(f, "{}", v),
            Self::Temporal(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
        }
    }
}

/// A declarative rule over one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expectation {
    /// Column must contain no nulls
    NotNull { column: String },
    /// Every non-null value lies in `[min, max]`
    ValueRange {
        column: String,
        min: RangeBound,
        max: RangeBound,
    },
    /// Every non-null value belongs to `allowed_values`
    ValueInSet {
        column: String,
        allowed_values: Vec<CellValue>,
    },
}

impl Expectation {
    /// Column the rule applies to.
    pub fn column(&self) -> &str {
        match self {
            Self::NotNull { column }
            | Self::ValueRange { column, .. }
            | Self::ValueInSet { column, .. } => column,
        }
    }

    /// Serialized type tag.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::NotNull { .. } => "not_null",
            Self::ValueRange { .. } => "value_range",
            Self::ValueInSet { .. } => "value_in_set",
        }
    }
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotNull { column } => write!(f, "{} is not null", column),
            Self::ValueRange { column, min, max } => {
                write!(f, "{} between {} and {}", column, min, max)
            }
            Self::ValueInSet {
                column,
                allowed_values,
            } => write!(f, "{} in set of {} values", column, allowed_values.len()),
        }
    }
}

/// Named, ordered collection of expectations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpectationSuite {
    /// Name recorded in validation results
    pub suite_name: String,
    /// Rules in evaluation order
    pub expectations: Vec<Expectation>,
}

impl ExpectationSuite {
    /// Creates an empty suite.
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            suite_name: suite_name.into(),
            expectations: Vec::new(),
        }
    }

    /// Appends an expectation.
    pub fn push(&mut self, expectation: Expectation) {
        self.expectations.push(expectation);
    }

    /// Number of expectations.
    pub fn len(&self) -> usize {
        self.expectations.len()
    }

    /// Returns true when the suite holds no expectations.
    pub fn is_empty(&self) -> bool {
        self.expectations.is_empty()
    }

    /// Expectations that apply to `column`.
    pub fn for_column<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Expectation> {
        self.expectations.iter().filter(move |e| e.column() == column)
    }
}
