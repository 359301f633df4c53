//! PostgreSQL data types to storage kinds.

use crate::models::DataKind;

/// Maps an `information_schema.columns.data_type` value to a [`DataKind`].
///
/// # Example
/// ```rust
/// use dbquality_core::adapters::postgres::map_postgres_kind;
/// use dbquality_core::models::DataKind;
///
/// assert_eq!(map_postgres_kind("timestamp with time zone"), DataKind::Temporal);
/// assert_eq!(map_postgres_kind("numeric"), DataKind::Numeric);
/// ```
pub fn map_postgres_kind(data_type: &str) -> DataKind {
    match data_type.to_lowercase().as_str() {
        "smallint" | "int2" | "integer" | "int" | "int4" | "bigint" | "int8" | "real"
        | "float4" | "double precision" | "float8" | "numeric" | "decimal" | "smallserial"
        | "serial" | "bigserial" => DataKind::Numeric,

        "boolean" | "bool" => DataKind::Boolean,

        "date"
        | "timestamp"
        | "timestamp without time zone"
        | "timestamp with time zone"
        | "timestamptz" => DataKind::Temporal,

        "character varying" | "varchar" | "character" | "char" | "text" | "citext" | "uuid"
        | "name" => DataKind::Text,

        _ => DataKind::Unknown,
    }
}
