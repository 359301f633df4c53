//! Core data models for tabular datasets.
//!
//! A [`Dataset`] is the in-memory shape of one table or query result: ordered,
//! named columns of nullable cells. Datasets are produced once per check by a
//! [`TabularSource`](crate::adapters::TabularSource) and never mutated.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Text form used for timestamps in persisted files and set membership.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A single nullable cell.
///
/// Serialized untagged so persisted suites read like plain JSON values.
/// Deserialization tries the variants in declaration order, so an ISO-8601
/// string comes back as [`CellValue::Timestamp`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// SQL NULL, or a float that was NaN
    Null,
    /// Boolean
    Bool(bool),
    /// Whole number
    Integer(i64),
    /// Finite floating-point number
    Float(f64),
    /// Date and time without zone
    Timestamp(NaiveDateTime),
    /// Anything else, as text
    Text(String),
}

impl CellValue {
    /// Builds a float cell; NaN and infinities become null.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Self::Float(value)
        } else {
            Self::Null
        }
    }

    /// Converts a JSON value as returned by `row_to_json` or a sample row.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Integer(i),
                None => n.as_f64().map_or(Self::Null, Self::from_f64),
            },
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    /// Null check; a NaN float counts as missing.
    pub fn is_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Numeric view of the cell, if it holds a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(i) => Some(*i as f64),
            Self::Float(f) if f.is_finite() => Some(*f),
            _ => None,
        }
    }

    /// Temporal view of the cell; text is parsed when it looks like a timestamp.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            Self::Text(s) => parse_timestamp(s),
            _ => None,
        }
    }

    /// Storage kind of a non-null cell.
    pub fn kind(&self) -> DataKind {
        match self {
            Self::Null => DataKind::Unknown,
            Self::Bool(_) => DataKind::Boolean,
            Self::Integer(_) => DataKind::Numeric,
            Self::Float(f) if f.is_nan() => DataKind::Unknown,
            Self::Float(_) => DataKind::Numeric,
            Self::Timestamp(_) => DataKind::Temporal,
            Self::Text(_) => DataKind::Text,
        }
    }

    /// Key used for distinct counting and set membership.
    ///
    /// Integers and integral floats share a key, and timestamps share the
    /// text namespace so a timestamp read back from JSON still matches.
    pub fn match_key(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(format!("b:{}", b)),
            Self::Integer(i) => Some(format!("n:{}", i)),
            Self::Float(f) if f.is_nan() => None,
            Self::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
                Some(format!("n:{}", *f as i64))
            }
            Self::Float(f) => Some(format!("n:{}", f)),
            Self::Timestamp(ts) => Some(format!("s:{}", ts.format(TIMESTAMP_FORMAT))),
            Self::Text(s) => Some(format!("s:{}", s)),
        }
    }

    /// Equality under [`CellValue::match_key`].
    pub fn loosely_equals(&self, other: &CellValue) -> bool {
        match (self.match_key(), other.match_key()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::Timestamp(ts) => write!(f, "{}", ts.format(TIMESTAMP_FORMAT)),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Parses the timestamp spellings produced by PostgreSQL and SQLite.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in [TIMESTAMP_FORMAT, "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Storage kind of a column, as reported by the source or seen in its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    /// Integers and floats
    Numeric,
    /// Dates and timestamps
    Temporal,
    /// Strings and anything stringly
    Text,
    /// Booleans; not numeric
    Boolean,
    /// No declared type and no non-null values
    Unknown,
}

impl std::fmt::Display for DataKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataKind::Numeric => "numeric",
            DataKind::Temporal => "temporal",
            DataKind::Text => "text",
            DataKind::Boolean => "boolean",
            DataKind::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

/// Column type used to choose inference rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    /// Numeric storage
    Numeric,
    /// Non-numeric with few distinct values
    Categorical,
    /// Temporal storage
    Temporal,
    /// Everything else, such as free text
    Other,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Categorical => "categorical",
            ColumnType::Temporal => "temporal",
            ColumnType::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// A named column of nullable cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as it appears in the source
    pub name: String,
    /// Storage kind shared by every non-null cell
    pub kind: DataKind,
    /// Cells in row order
    pub values: Vec<CellValue>,
}

impl Column {
    /// Creates a column whose kind is inferred from its values.
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        Self::with_kind(name, DataKind::Unknown, values)
    }

    /// Creates a column with a kind hint from the source schema.
    ///
    /// Cells are coerced toward the hint (timestamp text, 0/1 booleans). When
    /// the observed cells still disagree with the hint, the observed kind wins.
    pub fn with_kind(name: impl Into<String>, hint: DataKind, values: Vec<CellValue>) -> Self {
        let name = name.into();
        let mut values: Vec<CellValue> = values.into_iter().map(|v| coerce(v, hint)).collect();

        let observed = observed_kind(&values);
        let kind = match (hint, observed) {
            (_, DataKind::Unknown) => hint,
            (hint, observed) if hint == observed => hint,
            (DataKind::Unknown, DataKind::Text) if all_timestamps(&values) => {
                values = values.into_iter().map(|v| coerce(v, DataKind::Temporal)).collect();
                DataKind::Temporal
            }
            (DataKind::Unknown, observed) => observed,
            (hint, observed) => {
                tracing::debug!(
                    "Column '{}' declared as {} but holds {} values",
                    name,
                    hint,
                    observed
                );
                observed
            }
        };

        Self { name, kind, values }
    }

    /// Number of cells, null or not.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when the column has no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of null cells.
    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Iterates non-null cells in row order.
    pub fn non_null(&self) -> impl Iterator<Item = &CellValue> {
        self.values.iter().filter(|v| !v.is_null())
    }

    /// Distinct non-null values in first-seen order.
    pub fn distinct_non_null(&self) -> Vec<CellValue> {
        let mut seen = HashSet::new();
        self.non_null()
            .filter(|v| v.match_key().is_some_and(|key| seen.insert(key)))
            .cloned()
            .collect()
    }

    /// Number of distinct non-null values.
    pub fn distinct_count(&self) -> usize {
        self.non_null()
            .filter_map(CellValue::match_key)
            .collect::<HashSet<_>>()
            .len()
    }

    /// Non-null numeric cells paired with their row index.
    pub fn numeric_values(&self) -> Vec<(usize, f64)> {
        self.values
            .iter()
            .enumerate()
            .filter_map(|(row, v)| v.as_f64().map(|x| (row, x)))
            .collect()
    }

    /// Observed numeric minimum and maximum.
    pub fn numeric_range(&self) -> Option<(f64, f64)> {
        self.values.iter().filter_map(CellValue::as_f64).fold(None, |acc, x| match acc {
            None => Some((x, x)),
            Some((lo, hi)) => Some((lo.min(x), hi.max(x))),
        })
    }

    /// Observed earliest and latest timestamp.
    pub fn temporal_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let mut timestamps = self.values.iter().filter_map(CellValue::as_timestamp);
        let first = timestamps.next()?;
        Some(timestamps.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts))))
    }

    /// Returns true when the column holds numbers.
    pub fn is_numeric(&self) -> bool {
        self.kind == DataKind::Numeric
    }

    /// Classifies the column for rule inference.
    ///
    /// Numeric and temporal storage kinds map directly; any other column is
    /// categorical below `categorical_limit` distinct values, else other.
    pub fn column_type(&self, categorical_limit: usize) -> ColumnType {
        match self.kind {
            DataKind::Numeric => ColumnType::Numeric,
            DataKind::Temporal => ColumnType::Temporal,
            _ if self.distinct_count() < categorical_limit => ColumnType::Categorical,
            _ => ColumnType::Other,
        }
    }
}

fn coerce(value: CellValue, hint: DataKind) -> CellValue {
    match (hint, value) {
        (DataKind::Temporal, CellValue::Text(s)) => match parse_timestamp(&s) {
            Some(ts) => CellValue::Timestamp(ts),
            None => CellValue::Text(s),
        },
        (DataKind::Boolean, CellValue::Integer(0)) => CellValue::Bool(false),
        (DataKind::Boolean, CellValue::Integer(1)) => CellValue::Bool(true),
        (_, CellValue::Float(f)) if f.is_nan() => CellValue::Null,
        (_, value) => value,
    }
}

fn observed_kind(values: &[CellValue]) -> DataKind {
    let mut kind = DataKind::Unknown;
    for value in values.iter().filter(|v| !v.is_null()) {
        match (kind, value.kind()) {
            (DataKind::Unknown, k) => kind = k,
            (current, k) if current == k => {}
            // Mixed storage reads like a generic object column
            _ => return DataKind::Text,
        }
    }
    kind
}

fn all_timestamps(values: &[CellValue]) -> bool {
    values
        .iter()
        .filter(|v| !v.is_null())
        .all(|v| v.as_timestamp().is_some())
}

/// An immutable in-memory table or query result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Table or query name
    pub name: String,
    /// Columns in source order, all of equal length
    pub columns: Vec<Column>,
}

impl Dataset {
    /// Creates a dataset from already-built columns.
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Builds a dataset from JSON object rows.
    ///
    /// `schema` fixes column order and kind hints. When it is empty the
    /// columns are taken from the row keys in first-seen order.
    pub fn from_json_rows(
        name: impl Into<String>,
        rows: &[serde_json::Value],
        schema: &[(String, DataKind)],
    ) -> Self {
        let schema: Vec<(String, DataKind)> = if schema.is_empty() {
            let mut seen = HashSet::new();
            rows.iter()
                .filter_map(serde_json::Value::as_object)
                .flat_map(|obj| obj.keys())
                .filter(|key| seen.insert(key.as_str()))
                .map(|key| (key.clone(), DataKind::Unknown))
                .collect()
        } else {
            schema.to_vec()
        };

        let columns = schema
            .into_iter()
            .map(|(column_name, hint)| {
                let values = rows
                    .iter()
                    .map(|row| {
                        row.as_object()
                            .and_then(|obj| obj.get(&column_name))
                            .map_or(CellValue::Null, CellValue::from_json)
                    })
                    .collect();
                Column::with_kind(column_name, hint, values)
            })
            .collect();

        Self::new(name, columns)
    }

    /// Looks up a column by exact name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of rows (the longest column).
    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Column::len).max().unwrap_or(0)
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Total null cells across all columns.
    pub fn missing_cells(&self) -> usize {
        self.columns.iter().map(Column::null_count).sum()
    }

    /// Numeric columns in order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_numeric())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(text: &str) -> NaiveDateTime {
        parse_timestamp(text).unwrap()
    }

    #[test]
    fn test_parse_timestamp_formats() {
        assert_eq!(
            ts("2024-03-01T10:15:00"),
            ts("2024-03-01 10:15:00"),
            "T and space separators should agree"
        );
        assert_eq!(ts("2024-03-01T10:15:00+02:00"), ts("2024-03-01 08:15:00"));
        assert_eq!(ts("2024-03-01"), ts("2024-03-01T00:00:00"));
        assert!(parse_timestamp("not a date").is_none());
    }

    #[test]
    fn test_null_detection_includes_nan() {
        assert!(CellValue::Null.is_null());
        assert!(CellValue::Float(f64::NAN).is_null());
        assert!(!CellValue::Float(0.0).is_null());
        assert!(!CellValue::Text(String::new()).is_null());
    }

    #[test]
    fn test_match_key_normalizes_numbers_and_timestamps() {
        assert!(CellValue::Integer(3).loosely_equals(&CellValue::Float(3.0)));
        assert!(!CellValue::Integer(3).loosely_equals(&CellValue::Float(3.5)));
        assert!(
            CellValue::Timestamp(ts("2024-01-02T03:04:05"))
                .loosely_equals(&CellValue::Text("2024-01-02T03:04:05".to_string()))
        );
        assert!(!CellValue::Null.loosely_equals(&CellValue::Null));
        assert!(!CellValue::Bool(true).loosely_equals(&CellValue::Integer(1)));
    }

    #[test]
    fn test_cell_value_serde_shapes() {
        let cells = vec![
            CellValue::Null,
            CellValue::Bool(true),
            CellValue::Integer(7),
            CellValue::Float(1.5),
            CellValue::Timestamp(ts("2024-01-02T03:04:05")),
            CellValue::Text("open".to_string()),
        ];
        let json = serde_json::to_value(&cells).unwrap();
        assert_eq!(
            json,
            json!([null, true, 7, 1.5, "2024-01-02T03:04:05", "open"])
        );

        let back: Vec<CellValue> = serde_json::from_value(json).unwrap();
        assert_eq!(back, cells);
    }

    #[test]
    fn test_column_kind_inference() {
        let numeric = Column::new(
            "age",
            vec![CellValue::Integer(1), CellValue::Null, CellValue::Float(2.5)],
        );
        assert_eq!(numeric.kind, DataKind::Numeric);

        let mixed = Column::new(
            "code",
            vec![CellValue::Integer(1), CellValue::Text("a".to_string())],
        );
        assert_eq!(mixed.kind, DataKind::Text);

        let all_null = Column::new("empty", vec![CellValue::Null, CellValue::Null]);
        assert_eq!(all_null.kind, DataKind::Unknown);
    }

    #[test]
    fn test_column_with_kind_coerces_cells() {
        let temporal = Column::with_kind(
            "created_at",
            DataKind::Temporal,
            vec![
                CellValue::Text("2024-01-01 12:00:00".to_string()),
                CellValue::Null,
            ],
        );
        assert_eq!(temporal.kind, DataKind::Temporal);
        assert!(matches!(temporal.values[0], CellValue::Timestamp(_)));

        let flags = Column::with_kind(
            "active",
            DataKind::Boolean,
            vec![CellValue::Integer(1), CellValue::Integer(0)],
        );
        assert_eq!(flags.kind, DataKind::Boolean);
        assert_eq!(flags.values, vec![CellValue::Bool(true), CellValue::Bool(false)]);

        // A declared INTEGER column holding text falls back to the observed kind
        let dirty = Column::with_kind(
            "qty",
            DataKind::Numeric,
            vec![CellValue::Integer(1), CellValue::Text("n/a".to_string())],
        );
        assert_eq!(dirty.kind, DataKind::Text);
    }

    #[test]
    fn test_unknown_hint_upgrades_timestamp_text() {
        let column = Column::new(
            "seen",
            vec![
                CellValue::Text("2024-05-01T00:00:00".to_string()),
                CellValue::Text("2024-05-02".to_string()),
            ],
        );
        assert_eq!(column.kind, DataKind::Temporal);

        let plain = Column::new("status", vec![CellValue::Text("open".to_string())]);
        assert_eq!(plain.kind, DataKind::Text);
    }

    #[test]
    fn test_distinct_values_first_seen_order() {
        let column = Column::new(
            "status",
            vec![
                CellValue::Text("b".to_string()),
                CellValue::Null,
                CellValue::Text("a".to_string()),
                CellValue::Text("b".to_string()),
            ],
        );
        assert_eq!(
            column.distinct_non_null(),
            vec![CellValue::Text("b".to_string()), CellValue::Text("a".to_string())]
        );
        assert_eq!(column.distinct_count(), 2);
        assert_eq!(column.null_count(), 1);
    }

    #[test]
    fn test_column_type_classification() {
        let numeric = Column::new("n", vec![CellValue::Integer(1)]);
        assert_eq!(numeric.column_type(20), ColumnType::Numeric);

        let temporal = Column::new(
            "t",
            vec![CellValue::Timestamp(ts("2024-01-01T00:00:00"))],
        );
        assert_eq!(temporal.column_type(20), ColumnType::Temporal);

        let low_card = Column::new(
            "c",
            (0..5).map(|i| CellValue::Text(format!("v{}", i))).collect(),
        );
        assert_eq!(low_card.column_type(20), ColumnType::Categorical);

        let high_card = Column::new(
            "o",
            (0..20).map(|i| CellValue::Text(format!("v{}", i))).collect(),
        );
        assert_eq!(high_card.column_type(20), ColumnType::Other);

        let flags = Column::new("b", vec![CellValue::Bool(true), CellValue::Bool(false)]);
        assert_eq!(flags.column_type(20), ColumnType::Categorical);
    }

    #[test]
    fn test_ranges() {
        let column = Column::new(
            "x",
            vec![CellValue::Integer(5), CellValue::Null, CellValue::Float(-1.5)],
        );
        assert_eq!(column.numeric_range(), Some((-1.5, 5.0)));
        assert_eq!(column.numeric_values(), vec![(0, 5.0), (2, -1.5)]);

        let empty = Column::new("y", vec![CellValue::Null]);
        assert_eq!(empty.numeric_range(), None);
        assert_eq!(empty.temporal_range(), None);
    }

    #[test]
    fn test_dataset_from_json_rows_with_schema() {
        let rows = vec![
            json!({"id": 1, "name": "a", "created_at": "2024-01-01T00:00:00"}),
            json!({"id": 2, "name": null, "created_at": "2024-01-02T00:00:00"}),
        ];
        let schema = vec![
            ("id".to_string(), DataKind::Numeric),
            ("name".to_string(), DataKind::Text),
            ("created_at".to_string(), DataKind::Temporal),
        ];
        let dataset = Dataset::from_json_rows("users", &rows, &schema);

        assert_eq!(dataset.column_names(), vec!["id", "name", "created_at"]);
        assert_eq!(dataset.row_count(), 2);
        assert_eq!(dataset.missing_cells(), 1);
        assert_eq!(dataset.numeric_columns().count(), 1);
        assert_eq!(
            dataset.column("created_at").map(|c| c.kind),
            Some(DataKind::Temporal)
        );
    }

    #[test]
    fn test_dataset_from_json_rows_without_schema() {
        let rows = vec![json!({"b": 1}), json!({"a": "x", "b": 2}), json!([1, 2])];
        let dataset = Dataset::from_json_rows("q", &rows, &[]);

        assert_eq!(dataset.column_count(), 2);
        assert_eq!(dataset.row_count(), 3);
        let a = dataset.column("a").unwrap();
        assert_eq!(a.null_count(), 2);
    }
}
