//! Cross-table run summary.
//!
//! The orchestrator fills one [`TableSummary`] per table as stages finish and
//! writes the whole [`QualityCheckSummary`] once at the end of the run.

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use uuid::Uuid;

use crate::quality::{DatasetProfile, OutlierBounds, ValidationResult};

/// String-keyed map that serializes as a JSON object in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedMap<T>(Vec<(String, T)>);

impl<T> Default for OrderedMap<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> OrderedMap<T> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value`, replacing an existing entry for `key` in place.
    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        let key = key.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&T> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(k, _)| k.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<T: Serialize> Serialize for OrderedMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for OrderedMap<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedMapVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<T> {
            type Value = OrderedMap<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map with string keys")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut map = OrderedMap::new();
                while let Some((key, value)) = access.next_entry::<String, T>()? {
                    map.insert(key, value);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
    }
}

/// Profile stage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// HTML report path
    pub file: String,
    /// Columns
    pub variables: usize,
    /// Rows
    pub observations: usize,
    /// Null cells
    pub missing_cells: usize,
    /// Fraction of missing cells in `[0, 1]`
    pub missing_percent: f64,
}

impl ProfileSummary {
    /// Builds the record for `profile` written to `file`.
    pub fn new(profile: &DatasetProfile, file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            variables: profile.variables,
            observations: profile.observations,
            missing_cells: profile.missing_cells,
            missing_percent: profile.missing_percent,
        }
    }
}

/// Outcome for one analyzed column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnOutlierEntry {
    /// Detection ran
    Analyzed {
        /// Flagged values
        count: usize,
        /// Flagged values as a percentage of the table's rows
        percent: f64,
        /// Method-specific bounds
        bounds: OutlierBounds,
        /// Chart file, absent when no chart sink ran
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chart: Option<String>,
    },
    /// Detection or chart rendering failed
    Failed {
        /// Error message
        error: String,
    },
}

/// Outlier stage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutlierStageSummary {
    /// The table has no numeric columns; `status` is `no_numeric_columns`
    Skipped {
        /// Skip reason
        status: String,
    },
    /// Entries keyed by column name
    Columns(OrderedMap<ColumnOutlierEntry>),
}

impl OutlierStageSummary {
    /// Marker for tables without numeric columns.
    pub fn no_numeric_columns() -> Self {
        Self::Skipped {
            status: "no_numeric_columns".to_string(),
        }
    }
}

/// Validation stage record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Saved suite path
    pub expectations_file: String,
    /// Saved result path
    pub result_file: String,
    /// Fraction of successful expectations
    pub success_rate: f64,
    /// Success rate times 100
    pub success_percent: f64,
    /// Expectations evaluated
    pub total_expectations: usize,
    /// Expectations that succeeded
    pub successful_expectations: usize,
}

impl ValidationSummary {
    /// Builds the record for `result` and the files it was saved to.
    pub fn new(
        result: &ValidationResult,
        expectations_file: impl Into<String>,
        result_file: impl Into<String>,
    ) -> Self {
        Self {
            expectations_file: expectations_file.into(),
            result_file: result_file.into(),
            success_rate: result.success_rate(),
            success_percent: result.statistics.success_percent,
            total_expectations: result.statistics.evaluated_expectations,
            successful_expectations: result.statistics.successful_expectations,
        }
    }
}

/// Everything recorded for one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableSummary {
    /// Profile stage record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<ProfileSummary>,
    /// Outlier stage record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outliers: Option<OutlierStageSummary>,
    /// Validation stage record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationSummary>,
    /// First stage failure; later stages did not run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of one [`QualityCheckRunner`](crate::runner::QualityCheckRunner) run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityCheckSummary {
    /// Unique id of the run
    pub run_id: Uuid,
    /// When the run started
    pub timestamp: DateTime<Utc>,
    /// Records keyed by table name, in processing order
    pub tables: OrderedMap<TableSummary>,
}

impl Default for QualityCheckSummary {
    fn default() -> Self {
        Self::new()
    }
}

impl QualityCheckSummary {
    /// Starts an empty summary with a fresh run id.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            tables: OrderedMap::new(),
        }
    }

    /// Records `summary` for `table`.
    pub fn record(&mut self, table: impl Into<String>, summary: TableSummary) {
        self.tables.insert(table, summary);
    }

    /// Tables whose processing stopped on an error.
    pub fn failed_tables(&self) -> Vec<&str> {
        self.tables
            .iter()
            .filter(|(_, t)| t.error.is_some())
            .map(|(name, _)| name)
            .collect()
    }
}
