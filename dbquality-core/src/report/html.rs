//! HTML profile report.

use askama::Template;
use async_trait::async_trait;
use std::path::Path;

use super::{ProfileReporter, format_number, write_text};
use crate::Result;
use crate::error::DbQualityError;
use crate::models::CellValue;
use crate::quality::{ColumnProfile, DatasetProfile};

/// Renders profiles with the bundled `profile.html` template.
#[derive(Debug, Clone, Default)]
pub struct HtmlProfileReporter;

impl HtmlProfileReporter {
    /// Creates a reporter.
    pub fn new() -> Self {
        Self
    }

    /// Renders `profile` to an HTML string.
    pub fn render(&self, profile: &DatasetProfile, title: &str) -> Result<String> {
        let template = ProfileTemplate {
            title,
            dataset: &profile.name,
            generated_at: profile.generated_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            observations: profile.observations,
            variables: profile.variables,
            missing_cells: profile.missing_cells,
            missing_percent: percent(profile.missing_percent),
            columns: profile.columns.iter().map(ColumnRow::from).collect(),
        };
        template
            .render()
            .map_err(|e| DbQualityError::render(format!("profile report for '{}'", profile.name), e))
    }
}

#[async_trait]
impl ProfileReporter for HtmlProfileReporter {
    async fn write_profile(&self, profile: &DatasetProfile, title: &str, path: &Path) -> Result<()> {
        let html = self.render(profile, title)?;
        write_text(path, &html).await?;
        tracing::debug!("Wrote profile report {}", path.display());
        Ok(())
    }
}

#[derive(Template)]
#[template(path = "profile.html")]
struct ProfileTemplate<'a> {
    title: &'a str,
    dataset: &'a str,
    generated_at: String,
    observations: usize,
    variables: usize,
    missing_cells: usize,
    missing_percent: String,
    columns: Vec<ColumnRow>,
}

struct ColumnRow {
    name: String,
    column_type: String,
    kind: String,
    count: usize,
    missing: usize,
    missing_percent: String,
    distinct: usize,
    min: String,
    max: String,
    mean: String,
    std: String,
    most_common: String,
}

impl From<&ColumnProfile> for ColumnRow {
    fn from(column: &ColumnProfile) -> Self {
        let cell = |value: &Option<CellValue>| match value {
            Some(CellValue::Float(v)) => format_number(*v),
            Some(value) => value.to_string(),
            None => String::new(),
        };
        let number = |value: Option<f64>| value.map(format_number).unwrap_or_default();

        Self {
            name: column.name.clone(),
            column_type: column.column_type.to_string(),
            kind: column.kind.to_string(),
            count: column.count,
            missing: column.missing,
            missing_percent: percent(column.missing_percent),
            distinct: column.distinct,
            min: cell(&column.min),
            max: cell(&column.max),
            mean: number(column.mean),
            std: number(column.std),
            most_common: column
                .most_common
                .iter()
                .map(|vc| format!("{} ({})", vc.value, vc.count))
                .collect::<Vec<_>>()
                .join(", "),
        }
    }
}

fn percent(fraction: f64) -> String {
    format!("{:.1}%", fraction * 100.0)
}
