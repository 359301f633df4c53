//! Expectation inference from observed data.
//!
//! Rules are derived per column, in column order:
//! 1. no nulls observed: `not_null`
//! 2. numeric: `value_range` over the observed min/max
//! 3. categorical or low cardinality: `value_in_set` of distinct values
//! 4. temporal: `value_range` over the observed earliest/latest timestamp
//!
//! The resulting ranges and sets describe the training data exactly; they
//! are not widened for future data.

use crate::models::{Column, ColumnType, Dataset};

use super::config::InferenceConfig;
use super::expectations::{Expectation, ExpectationSuite, RangeBound};

/// Derives expectation suites from datasets.
#[derive(Debug, Clone, Default)]
pub struct ExpectationInferencer {
    config: InferenceConfig,
}

impl ExpectationInferencer {
    /// Creates an inferencer with the given settings.
    pub fn new(config: InferenceConfig) -> Self {
        Self { config }
    }

    /// Infers a suite named `suite_name` from `dataset`.
    ///
    /// Deterministic: the same dataset always yields the same suite.
    pub fn infer(&self, dataset: &Dataset, suite_name: &str) -> ExpectationSuite {
        let mut suite = ExpectationSuite::new(suite_name);
        for column in &dataset.columns {
            for expectation in self.infer_column(column) {
                suite.push(expectation);
            }
        }

        tracing::debug!(
            "Inferred {} expectations for '{}' across {} columns",
            suite.len(),
            dataset.name,
            dataset.column_count()
        );
        suite
    }

    fn infer_column(&self, column: &Column) -> Vec<Expectation> {
        let mut expectations = Vec::with_capacity(2);
        let limit = self.config.categorical_limit;

        if column.null_count() == 0 {
            expectations.push(Expectation::NotNull {
                column: column.name.clone(),
            });
        }

        let column_type = column.column_type(limit);
        let value_rule = match column_type {
            ColumnType::Numeric => column.numeric_range().map(|(min, max)| Expectation::ValueRange {
                column: column.name.clone(),
                min: RangeBound::Numeric(min),
                max: RangeBound::Numeric(max),
            }),
            _ if column_type == ColumnType::Categorical || column.distinct_count() < limit => {
                Some(Expectation::ValueInSet {
                    column: column.name.clone(),
                    allowed_values: column.distinct_non_null(),
                })
            }
            ColumnType::Temporal => {
                column
                    .temporal_range()
                    .map(|(min, max)| Expectation::ValueRange {
                        column: column.name.clone(),
                        min: RangeBound::Temporal(min),
                        max: RangeBound::Temporal(max),
                    })
            }
            _ => None,
        };

        expectations.extend(value_rule);
        expectations
    }
}

/// Infers a suite with the default settings.
pub fn infer_expectations(dataset: &Dataset, suite_name: &str) -> ExpectationSuite {
    ExpectationInferencer::default().infer(dataset, suite_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, DataKind, parse_timestamp};

    fn text(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::Text(v.to_string())).collect()
    }

    fn timestamps(count: usize) -> Vec<CellValue> {
        (0..count)
            .map(|day| {
                let text = format!("2024-01-{:02}T00:00:00", day + 1);
                CellValue::Timestamp(parse_timestamp(&text).unwrap())
            })
            .collect()
    }

    #[test]
    fn test_numeric_column_rules() {
        let dataset = Dataset::new(
            "people",
            vec![Column::new(
                "age",
                vec![CellValue::Integer(30), CellValue::Integer(18), CellValue::Integer(65)],
            )],
        );
        let suite = infer_expectations(&dataset, "people_suite");

        assert_eq!(suite.suite_name, "people_suite");
        assert_eq!(
            suite.expectations,
            vec![
                Expectation::NotNull {
                    column: "age".to_string()
                },
                Expectation::ValueRange {
                    column: "age".to_string(),
                    min: RangeBound::Numeric(18.0),
                    max: RangeBound::Numeric(65.0),
                },
            ]
        );
    }

    #[test]
    fn test_nullable_categorical_column() {
        let mut values = text(&["b", "a", "b"]);
        values.push(CellValue::Null);
        let dataset = Dataset::new("t", vec![Column::new("status", values)]);
        let suite = infer_expectations(&dataset, "s");

        assert_eq!(
            suite.expectations,
            vec![Expectation::ValueInSet {
                column: "status".to_string(),
                allowed_values: text(&["b", "a"]),
            }]
        );
    }

    #[test]
    fn test_high_cardinality_text_gets_no_value_rule() {
        let values: Vec<String> = (0..25).map(|i| format!("user{}", i)).collect();
        let refs: Vec<&str> = values.iter().map(String::as_str).collect();
        let dataset = Dataset::new("t", vec![Column::new("login", text(&refs))]);
        let suite = infer_expectations(&dataset, "s");

        assert_eq!(suite.len(), 1);
        assert_eq!(suite.expectations[0].kind_name(), "not_null");
    }

    #[test]
    fn test_temporal_rules_depend_on_cardinality() {
        // Few distinct timestamps fall under the cardinality rule first
        let low = Dataset::new("t", vec![Column::new("day", timestamps(3))]);
        let suite = infer_expectations(&low, "s");
        assert_eq!(suite.expectations[1].kind_name(), "value_in_set");

        let high = Dataset::new("t", vec![Column::new("day", timestamps(25))]);
        let suite = infer_expectations(&high, "s");
        let Expectation::ValueRange { min, max, .. } = &suite.expectations[1] else {
            panic!("expected a range rule, got {:?}", suite.expectations[1]);
        };
        assert_eq!(min.to_string(), "2024-01-01T00:00:00");
        assert_eq!(max.to_string(), "2024-01-25T00:00:00");
    }

    #[test]
    fn test_all_null_columns() {
        let dataset = Dataset::new(
            "t",
            vec![
                Column::with_kind("score", DataKind::Numeric, vec![CellValue::Null; 3]),
                Column::new("note", vec![CellValue::Null; 3]),
            ],
        );
        let suite = infer_expectations(&dataset, "s");

        // No range for an all-null numeric column; an empty set for the rest
        assert_eq!(
            suite.expectations,
            vec![Expectation::ValueInSet {
                column: "note".to_string(),
                allowed_values: vec![],
            }]
        );
    }

    #[test]
    fn test_configurable_categorical_limit() {
        let dataset = Dataset::new("t", vec![Column::new("c", text(&["x", "y", "z"]))]);
        let strict = ExpectationInferencer::new(InferenceConfig::default().with_categorical_limit(3));
        let suite = strict.infer(&dataset, "s");
        assert_eq!(suite.len(), 1);
    }

    #[test]
    fn test_inference_is_deterministic() {
        let dataset = Dataset::new(
            "t",
            vec![
                Column::new("status", text(&["open", "closed", "open"])),
                Column::new("n", vec![CellValue::Float(1.5), CellValue::Null]),
            ],
        );
        assert_eq!(
            infer_expectations(&dataset, "s"),
            infer_expectations(&dataset, "s")
        );
    }
}
