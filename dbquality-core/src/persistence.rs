//! Report directory layout and JSON persistence.
//!
//! Every artifact of a run lives under one [`ReportDir`]. File names carry
//! the run timestamp so repeated runs never overwrite each other.

use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::Result;
use crate::error::DbQualityError;
use crate::quality::{ExpectationSuite, ValidationResult};
use crate::summary::QualityCheckSummary;

/// Default directory for generated reports.
pub const DEFAULT_REPORT_DIR: &str = "./data_quality_reports";

/// Timestamp format used in artifact names.
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Joins table and column in chart names. Never produced by sanitizing.
const NAME_SEPARATOR: char = '+';

/// Hex digits of the name digest appended to rewritten names.
const NAME_DIGEST_LEN: usize = 8;

/// Root directory of one run's artifacts and the timestamp used to name them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDir {
    root: PathBuf,
    timestamp: String,
}

impl ReportDir {
    /// Creates a report dir stamped with the current local time.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_timestamp(
            root,
            chrono::Local::now().format(FILE_TIMESTAMP_FORMAT).to_string(),
        )
    }

    /// Creates a report dir with an explicit timestamp suffix.
    pub fn with_timestamp(root: impl Into<PathBuf>, timestamp: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            timestamp: timestamp.into(),
        }
    }

    /// Directory all artifacts are written to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Suffix shared by every artifact of this run.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Creates the root directory if it does not exist yet.
    pub async fn ensure_exists(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| DbQualityError::io(&self.root, "create directory", e))
    }

    /// `profile_{table}_{ts}.html`
    pub fn profile_path(&self, table: &str) -> PathBuf {
        self.artifact(&format!("profile_{}", sanitize(table)), "html")
    }

    /// `outliers_{table}+{column}_{ts}.svg`
    pub fn outlier_chart_path(&self, table: &str, column: &str) -> PathBuf {
        self.artifact(
            &format!(
                "outliers_{}{}{}",
                sanitize(table),
                NAME_SEPARATOR,
                sanitize(column)
            ),
            "svg",
        )
    }

    /// `expectations_{table}_{ts}.json`
    pub fn expectations_path(&self, table: &str) -> PathBuf {
        self.artifact(&format!("expectations_{}", sanitize(table)), "json")
    }

    /// `validation_{table}_{ts}.json`
    pub fn validation_path(&self, table: &str) -> PathBuf {
        self.artifact(&format!("validation_{}", sanitize(table)), "json")
    }

    /// `quality_check_summary_{ts}.json`
    pub fn summary_path(&self) -> PathBuf {
        self.artifact("quality_check_summary", "json")
    }

    fn artifact(&self, stem: &str, extension: &str) -> PathBuf {
        self.root
            .join(format!("{}_{}.{}", stem, self.timestamp, extension))
    }
}

/// Makes a table or column name safe to embed in a file name.
///
/// Names that had to be rewritten get a digest of the original appended,
/// so `order items` and `order_items` stay distinct.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    match cleaned {
        "" => format!("unnamed-{}", name_digest(name)),
        unchanged if unchanged == name => unchanged.to_string(),
        rewritten => format!("{}-{}", rewritten, name_digest(name)),
    }
}

fn name_digest(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let mut digest = format!("{:x}", hasher.finalize());
    digest.truncate(NAME_DIGEST_LEN);
    digest
}

/// Serializes `value` as pretty JSON and writes it to `path`.
pub async fn write_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        DbQualityError::serialization(format!("JSON for {}", path.display()), e)
    })?;
    crate::report::write_text(path, &json).await
}

/// Reads and deserializes a JSON document from `path`.
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| DbQualityError::io(path, "read", e))?;
    serde_json::from_str(&contents)
        .map_err(|e| DbQualityError::serialization(format!("parsing {}", path.display()), e))
}

/// Writes an expectation suite.
pub async fn save_suite(suite: &ExpectationSuite, path: &Path) -> Result<()> {
    write_json(suite, path).await?;
    tracing::info!(
        "Saved suite '{}' ({} expectations) to {}",
        suite.suite_name,
        suite.len(),
        path.display()
    );
    Ok(())
}

/// Loads an expectation suite written by [`save_suite`].
pub async fn load_suite(path: &Path) -> Result<ExpectationSuite> {
    let suite: ExpectationSuite = read_json(path).await?;
    tracing::debug!(
        "Loaded suite '{}' with {} expectations",
        suite.suite_name,
        suite.len()
    );
    Ok(suite)
}

/// Writes a validation result.
pub async fn save_validation_result(result: &ValidationResult, path: &Path) -> Result<()> {
    write_json(result, path).await?;
    tracing::info!("Saved validation result to {}", path.display());
    Ok(())
}

/// Loads a validation result written by [`save_validation_result`].
pub async fn load_validation_result(path: &Path) -> Result<ValidationResult> {
    read_json(path).await
}

/// Writes the cross-table run summary.
pub async fn save_summary(summary: &QualityCheckSummary, path: &Path) -> Result<()> {
    write_json(summary, path).await?;
    tracing::info!("Saved run summary to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CellValue, Column, Dataset};
    use crate::quality::{Expectation, RangeBound, validate};

    fn dir() -> ReportDir {
        ReportDir::with_timestamp("/reports", "20240101_120000")
    }

    #[test]
    fn test_artifact_names() {
        let dir = dir();
        assert_eq!(
            dir.profile_path("users"),
            PathBuf::from("/reports/profile_users_20240101_120000.html")
        );
        assert_eq!(
            dir.outlier_chart_path("users", "age"),
            PathBuf::from("/reports/outliers_users+age_20240101_120000.svg")
        );
        assert_eq!(
            dir.expectations_path("users"),
            PathBuf::from("/reports/expectations_users_20240101_120000.json")
        );
        assert_eq!(
            dir.validation_path("users"),
            PathBuf::from("/reports/validation_users_20240101_120000.json")
        );
        assert_eq!(
            dir.summary_path(),
            PathBuf::from("/reports/quality_check_summary_20240101_120000.json")
        );
    }

    #[test]
    fn test_names_are_sanitized() {
        let dir = dir();
        let path = dir.profile_path("../etc/passwd");
        assert_eq!(path.parent(), Some(Path::new("/reports")));
        let file = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file.starts_with("profile__etc_passwd-"), "{}", file);

        assert_eq!(sanitize("public.users"), "public.users");
        assert_eq!(sanitize("order_items"), "order_items");
        let rewritten = sanitize("order items");
        assert!(rewritten.starts_with("order_items-"));
        assert_eq!(rewritten.len(), "order_items-".len() + NAME_DIGEST_LEN);
        assert!(sanitize("..").starts_with("unnamed-"));
        assert_ne!(sanitize(".."), sanitize("..."));
    }

    #[test]
    fn test_distinct_names_never_share_a_path() {
        let dir = dir();
        assert_ne!(
            dir.outlier_chart_path("user", "account_id"),
            dir.outlier_chart_path("user_account", "id")
        );
        assert_ne!(
            dir.profile_path("order items"),
            dir.profile_path("order_items")
        );
        assert_ne!(
            dir.outlier_chart_path("order items", "qty"),
            dir.outlier_chart_path("order_items", "qty")
        );
        assert_eq!(
            dir.outlier_chart_path("order items", "qty"),
            dir.outlier_chart_path("order items", "qty")
        );
    }

    #[test]
    fn test_default_timestamp_shape() {
        let dir = ReportDir::new("out");
        assert_eq!(dir.timestamp().len(), 15);
        assert_eq!(dir.timestamp().as_bytes()[8], b'_');
        assert_eq!(dir.root(), Path::new("out"));
    }

    #[tokio::test]
    async fn test_ensure_exists_creates_nested_root() {
        let temp = tempfile::tempdir().unwrap();
        let dir = ReportDir::new(temp.path().join("a/b"));
        dir.ensure_exists().await.unwrap();
        assert!(temp.path().join("a/b").is_dir());
        // Idempotent
        dir.ensure_exists().await.unwrap();
    }

    #[tokio::test]
    async fn test_suite_round_trip_keeps_verdicts() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("suite.json");

        let mut suite = ExpectationSuite::new("people_suite");
        suite.push(Expectation::NotNull {
            column: "age".to_string(),
        });
        suite.push(Expectation::ValueRange {
            column: "age".to_string(),
            min: RangeBound::Numeric(18.0),
            max: RangeBound::Numeric(65.0),
        });
        suite.push(Expectation::ValueInSet {
            column: "city".to_string(),
            allowed_values: vec![CellValue::Text("Oslo".to_string())],
        });

        save_suite(&suite, &path).await.unwrap();
        let loaded = load_suite(&path).await.unwrap();
        assert_eq!(loaded, suite);

        let dataset = Dataset::new(
            "people",
            vec![
                Column::new(
                    "age",
                    vec![CellValue::Integer(20), CellValue::Null, CellValue::Integer(70)],
                ),
                Column::new(
                    "city",
                    vec![
                        CellValue::Text("Oslo".to_string()),
                        CellValue::Text("Oslo".to_string()),
                        CellValue::Text("Rome".to_string()),
                    ],
                ),
            ],
        );
        let before: Vec<bool> = validate(&dataset, &suite).results.iter().map(|r| r.success).collect();
        let after: Vec<bool> = validate(&dataset, &loaded).results.iter().map(|r| r.success).collect();
        assert_eq!(before, after);
        assert_eq!(before, vec![false, false, false]);
    }

    #[tokio::test]
    async fn test_validation_result_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested/validation.json");
        let dataset = Dataset::new("t", vec![Column::new("x", vec![CellValue::Integer(1)])]);
        let mut suite = ExpectationSuite::new("t_suite");
        suite.push(Expectation::NotNull {
            column: "x".to_string(),
        });
        let result = validate(&dataset, &suite);

        save_validation_result(&result, &path).await.unwrap();
        let loaded = load_validation_result(&path).await.unwrap();
        assert_eq!(loaded.suite_name, "t_suite");
        assert_eq!(loaded.statistics, result.statistics);
        assert!(loaded.success);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = load_suite(&temp.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(err, DbQualityError::Io { .. }));
    }

    #[tokio::test]
    async fn test_load_malformed_file_is_serialization_error() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("bad.json");
        std::fs::write(&path, "{\"suite_name\": 3}").unwrap();
        let err = load_suite(&path).await.unwrap_err();
        assert!(matches!(err, DbQualityError::Serialization { .. }));
    }
}
