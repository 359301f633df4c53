//! PostgreSQL table listing and row loading.
//!
//! Rows are fetched as `row_to_json` objects and column kinds come from
//! `information_schema.columns`.

use crate::adapters::helpers::quote_identifier;
use crate::error::DbQualityError;
use crate::models::{DataKind, Dataset};
use crate::Result;
use serde_json::Value as JsonValue;
use sqlx::PgPool;

use super::type_mapping::map_postgres_kind;

/// Lists base tables of the current schema, ordered by name.
pub async fn list_tables(pool: &PgPool) -> Result<Vec<String>> {
    sqlx::query_scalar(
        r#"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = current_schema()
          AND table_type = 'BASE TABLE'
        ORDER BY table_name
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(|e| DbQualityError::query_failed("Failed to list tables", e))
}

/// Declared columns of `table` in ordinal order.
///
/// `table` may be schema-qualified; otherwise the current schema is used.
pub async fn table_schema(pool: &PgPool, table: &str) -> Result<Vec<(String, DataKind)>> {
    let (schema, name) = match table.split_once('.') {
        Some((schema, name)) => (Some(schema), name),
        None => (None, table),
    };

    let rows: Vec<(String, String)> = sqlx::query_as(
        r#"
        SELECT column_name::text, data_type::text
        FROM information_schema.columns
        WHERE table_schema = COALESCE($1, current_schema())
          AND table_name = $2
        ORDER BY ordinal_position
        "#,
    )
    .bind(schema)
    .bind(name)
    .fetch_all(pool)
    .await
    .map_err(|e| {
        DbQualityError::query_failed(format!("Failed to read columns of table '{}'", table), e)
    })?;

    Ok(rows
        .into_iter()
        .map(|(column, data_type)| (column, map_postgres_kind(&data_type)))
        .collect())
}

/// Loads up to `limit` rows of `table` into a dataset.
pub async fn load_table(pool: &PgPool, table: &str, limit: Option<u32>) -> Result<Dataset> {
    let schema = table_schema(pool, table).await?;
    if schema.is_empty() {
        return Err(DbQualityError::query_failed(
            format!("Failed to load table '{}'", table),
            sqlx::Error::RowNotFound,
        ));
    }

    // LIMIT NULL means no limit
    let query = format!(
        "SELECT row_to_json(t.*) AS row_data FROM {} t LIMIT $1",
        quote_identifier(table)?
    );
    let rows: Vec<JsonValue> = sqlx::query_scalar(&query)
        .bind(limit.map(i64::from))
        .fetch_all(pool)
        .await
        .map_err(|e| {
            DbQualityError::query_failed(format!("Failed to load rows from table '{}'", table), e)
        })?;

    tracing::debug!("Loaded {} rows from PostgreSQL table '{}'", rows.len(), table);
    Ok(Dataset::from_json_rows(table, &rows, &schema))
}

/// Runs a read-only query; column kinds are inferred from the values.
pub async fn load_query(pool: &PgPool, name: &str, query: &str) -> Result<Dataset> {
    let wrapped = format!(
        "SELECT row_to_json(q.*) AS row_data FROM ({}) q",
        query.trim().trim_end_matches(';')
    );
    let rows: Vec<JsonValue> = sqlx::query_scalar(&wrapped)
        .fetch_all(pool)
        .await
        .map_err(|e| DbQualityError::query_failed(format!("Failed to run query '{}'", name), e))?;

    Ok(Dataset::from_json_rows(name, &rows, &[]))
}
