//! SQLite declared types to storage kinds.
//!
//! SQLite derives type affinity from the declared type name. Temporal and
//! boolean names have no affinity of their own, so they are matched first.

use crate::models::DataKind;

/// Maps a declared SQLite column type to a [`DataKind`] hint.
///
/// # Example
/// ```rust
/// use dbquality_core::adapters::sqlite::map_sqlite_kind;
/// use dbquality_core::models::DataKind;
///
/// assert_eq!(map_sqlite_kind("VARCHAR(255)"), DataKind::Text);
/// assert_eq!(map_sqlite_kind("BIGINT"), DataKind::Numeric);
/// ```
pub fn map_sqlite_kind(sqlite_type: &str) -> DataKind {
    let type_upper = sqlite_type.trim().to_uppercase();

    if type_upper.is_empty() || type_upper.contains("BLOB") {
        return DataKind::Unknown;
    }
    if type_upper.contains("BOOL") {
        return DataKind::Boolean;
    }
    if type_upper.contains("DATE") || type_upper.contains("TIME") {
        return DataKind::Temporal;
    }
    if type_upper.contains("INT") {
        return DataKind::Numeric;
    }
    if type_upper.contains("CHAR") || type_upper.contains("CLOB") || type_upper.contains("TEXT") {
        return DataKind::Text;
    }
    if type_upper.contains("REAL")
        || type_upper.contains("FLOA")
        || type_upper.contains("DOUB")
        || type_upper.contains("NUMERIC")
        || type_upper.contains("DECIMAL")
    {
        return DataKind::Numeric;
    }

    DataKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_sqlite_kind() {
        let cases = [
            ("INTEGER", DataKind::Numeric),
            ("tinyint", DataKind::Numeric),
            ("REAL", DataKind::Numeric),
            ("DECIMAL(10,2)", DataKind::Numeric),
            ("TEXT", DataKind::Text),
            ("NVARCHAR(40)", DataKind::Text),
            ("DATETIME", DataKind::Temporal),
            ("TIMESTAMP", DataKind::Temporal),
            ("date", DataKind::Temporal),
            ("BOOLEAN", DataKind::Boolean),
            ("BLOB", DataKind::Unknown),
            ("", DataKind::Unknown),
        ];
        for (declared, expected) in cases {
            assert_eq!(map_sqlite_kind(declared), expected, "{}", declared);
        }
    }
}
