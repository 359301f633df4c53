//! Report and chart sinks.
//!
//! Sinks turn computed results into files: an HTML profile per table and an
//! SVG chart per analyzed column. Both are traits so the orchestrator can run
//! with other renderers or none at all.

use async_trait::async_trait;
use std::path::Path;

use crate::Result;
use crate::error::DbQualityError;
use crate::quality::{DatasetProfile, OutlierReport};

mod charts;
mod html;

pub use charts::{ChartDimensions, HISTOGRAM_BINS, SvgChartRenderer};
pub use html::HtmlProfileReporter;

/// Writes a human-readable profile document.
#[async_trait]
pub trait ProfileReporter: Send + Sync {
    /// Renders `profile` under `title` and writes it to `path`.
    async fn write_profile(&self, profile: &DatasetProfile, title: &str, path: &Path) -> Result<()>;
}

/// Writes an outlier visualization.
#[async_trait]
pub trait ChartSink: Send + Sync {
    /// Renders the chart for `report`; `values` are the column's non-null values.
    async fn write_outlier_chart(
        &self,
        report: &OutlierReport,
        values: &[f64],
        path: &Path,
    ) -> Result<()>;
}

/// Writes `contents` to `path`, creating parent directories.
pub(crate) async fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DbQualityError::io(parent, "create directory", e))?;
    }
    tokio::fs::write(path, contents)
        .await
        .map_err(|e| DbQualityError::io(path, "write", e))
}

/// Short human-readable number: at most four decimals, trailing zeros cut.
pub(crate) fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "n/a".to_string();
    }
    if value != 0.0 && (value.abs() >= 1.0e7 || value.abs() < 1.0e-4) {
        return format!("{:.3e}", value);
    }
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    if text == "-0" { "0".to_string() } else { text.to_string() }
}
