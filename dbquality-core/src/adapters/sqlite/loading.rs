//! SQLite table listing and row loading.
//!
//! SQLite is dynamically typed, so each cell is decoded by trying the
//! storage classes in turn and then coerced toward the declared column kind.

use crate::adapters::helpers::quote_identifier;
use crate::error::DbQualityError;
use crate::models::{CellValue, Column, DataKind, Dataset};
use crate::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use super::type_mapping::map_sqlite_kind;

/// Lists user tables, skipping SQLite's internal tables.
pub async fn list_tables(pool: &SqlitePool) -> Result<Vec<String>> {
    sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| DbQualityError::query_failed("Failed to list tables from sqlite_master", e))
}

/// Declared columns of `table` in ordinal order.
pub async fn table_schema(pool: &SqlitePool, table: &str) -> Result<Vec<(String, DataKind)>> {
    let rows = sqlx::query("SELECT name, type FROM pragma_table_info(?) ORDER BY cid")
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            DbQualityError::query_failed(format!("Failed to read columns of table '{}'", table), e)
        })?;

    Ok(rows
        .iter()
        .map(|row| {
            let name: String = row.try_get("name").unwrap_or_default();
            let declared: String = row.try_get("type").unwrap_or_default();
            (name, map_sqlite_kind(&declared))
        })
        .collect())
}

/// Loads up to `limit` rows of `table` into a dataset.
pub async fn load_table(pool: &SqlitePool, table: &str, limit: Option<u32>) -> Result<Dataset> {
    let schema = table_schema(pool, table).await?;
    if schema.is_empty() {
        return Err(DbQualityError::query_failed(
            format!("Failed to load table '{}'", table),
            sqlx::Error::RowNotFound,
        ));
    }

    // LIMIT -1 means no limit in SQLite
    let query = format!("SELECT * FROM {} LIMIT ?", quote_identifier(table)?);
    let rows = sqlx::query(&query)
        .bind(limit.map_or(-1, i64::from))
        .fetch_all(pool)
        .await
        .map_err(|e| {
            DbQualityError::query_failed(format!("Failed to load rows from table '{}'", table), e)
        })?;

    tracing::debug!("Loaded {} rows from SQLite table '{}'", rows.len(), table);
    Ok(rows_to_dataset(table, &rows, &schema))
}

/// Runs a read-only query; column kinds are inferred from the values.
pub async fn load_query(pool: &SqlitePool, name: &str, query: &str) -> Result<Dataset> {
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .await
        .map_err(|e| DbQualityError::query_failed(format!("Failed to run query '{}'", name), e))?;

    let schema: Vec<(String, DataKind)> = rows
        .first()
        .map(|row| {
            use sqlx::Column as _;
            row.columns()
                .iter()
                .map(|c| (c.name().to_string(), DataKind::Unknown))
                .collect()
        })
        .unwrap_or_default();

    Ok(rows_to_dataset(name, &rows, &schema))
}

fn rows_to_dataset(name: &str, rows: &[SqliteRow], schema: &[(String, DataKind)]) -> Dataset {
    let columns = schema
        .iter()
        .enumerate()
        .map(|(index, (column_name, hint))| {
            let values = rows.iter().map(|row| extract_cell(row, index)).collect();
            Column::with_kind(column_name.clone(), *hint, values)
        })
        .collect();
    Dataset::new(name, columns)
}

/// Decodes one cell by trying SQLite storage classes in turn.
fn extract_cell(row: &SqliteRow, index: usize) -> CellValue {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map_or(CellValue::Null, CellValue::Text);
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map_or(CellValue::Null, CellValue::Integer);
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map_or(CellValue::Null, CellValue::from_f64);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        // BLOBs are carried as base64 text
        return v.map_or(CellValue::Null, |bytes| {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
            CellValue::Text(format!("base64:{}", encoded))
        });
    }

    CellValue::Null
}
