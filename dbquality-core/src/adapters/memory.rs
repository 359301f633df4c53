//! In-memory tabular source.
//!
//! Holds pre-built datasets; useful for tests and for embedding the quality
//! engine behind a custom loader.

use async_trait::async_trait;

use super::{ConnectionConfig, SourceType, TabularSource};
use crate::error::DbQualityError;
use crate::models::{Column, Dataset};
use crate::Result;

/// Source backed by datasets kept in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    tables: Vec<Dataset>,
}

impl MemorySource {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add a table; the dataset name is the table name.
    pub fn with_table(mut self, dataset: Dataset) -> Self {
        self.tables.retain(|t| t.name != dataset.name);
        self.tables.push(dataset);
        self
    }

    fn find(&self, table: &str) -> Result<&Dataset> {
        self.tables.iter().find(|t| t.name == table).ok_or_else(|| {
            DbQualityError::query_failed(
                format!("Failed to load table '{}'", table),
                std::io::Error::new(std::io::ErrorKind::NotFound, "no such table"),
            )
        })
    }
}

#[async_trait]
impl TabularSource for MemorySource {
    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        Ok(self.tables.iter().map(|t| t.name.clone()).collect())
    }

    async fn load_table(&self, table: &str, limit: Option<u32>) -> Result<Dataset> {
        let dataset = self.find(table)?;
        let Some(limit) = limit else {
            return Ok(dataset.clone());
        };

        let columns = dataset
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                kind: c.kind,
                values: c.values.iter().take(limit as usize).cloned().collect(),
            })
            .collect();
        Ok(Dataset::new(&dataset.name, columns))
    }

    /// Queries are table names here: the named table is returned as-is.
    async fn load_query(&self, name: &str, query: &str) -> Result<Dataset> {
        let mut dataset = self.find(query.trim())?.clone();
        dataset.name = name.to_string();
        Ok(dataset)
    }

    fn source_type(&self) -> SourceType {
        SourceType::Memory
    }

    fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new("memory")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CellValue;

    fn source() -> MemorySource {
        MemorySource::new()
            .with_table(Dataset::new(
                "b_table",
                vec![Column::new(
                    "x",
                    (1..=5).map(CellValue::Integer).collect(),
                )],
            ))
            .with_table(Dataset::new("a_table", vec![]))
    }

    #[tokio::test]
    async fn test_lists_in_insertion_order() {
        let tables = source().list_tables().await.unwrap();
        assert_eq!(tables, vec!["b_table", "a_table"]);
    }

    #[tokio::test]
    async fn test_load_table_with_limit() {
        let dataset = source().load_table("b_table", Some(2)).await.unwrap();
        assert_eq!(dataset.row_count(), 2);

        let dataset = source().load_table("b_table", None).await.unwrap();
        assert_eq!(dataset.row_count(), 5);
    }

    #[tokio::test]
    async fn test_missing_table_is_query_error() {
        let err = source().load_table("nope", None).await.unwrap_err();
        assert!(matches!(err, DbQualityError::Query { .. }));
    }

    #[tokio::test]
    async fn test_load_query_renames() {
        let dataset = source().load_query("recent", "b_table").await.unwrap();
        assert_eq!(dataset.name, "recent");
    }
}
