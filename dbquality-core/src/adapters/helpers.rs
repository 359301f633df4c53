//! Helper utilities shared by source adapters.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::DbQualityError;

/// Table name prefixes reserved for database catalogs.
pub const SYSTEM_TABLE_PREFIXES: &[&str] = &["pg_", "sql_"];

/// Plain identifier part: no control characters and no NUL.
static IDENTIFIER_PART: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\x00-\x1f\x7f]{1,128}$").ok());

/// Returns true for catalog tables that quality checks skip.
pub fn is_system_table(name: &str) -> bool {
    SYSTEM_TABLE_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

/// Quotes a possibly schema-qualified table name with double quotes.
///
/// `public.orders` becomes `"public"."orders"`; embedded quotes are doubled.
///
/// # Errors
/// Returns a configuration error for empty parts or control characters.
pub fn quote_identifier(name: &str) -> crate::Result<String> {
    let pattern = IDENTIFIER_PART
        .as_ref()
        .ok_or_else(|| DbQualityError::configuration("identifier pattern unavailable"))?;

    let parts: Vec<String> = name
        .split('.')
        .map(|part| {
            if pattern.is_match(part) {
                Ok(format!("\"{}\"", part.replace('"', "\"\"")))
            } else {
                Err(DbQualityError::configuration(format!(
                    "Invalid table identifier '{}'",
                    name.escape_default()
                )))
            }
        })
        .collect::<crate::Result<_>>()?;

    Ok(parts.join("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_system_table() {
        assert!(is_system_table("pg_stat_statements"));
        assert!(is_system_table("sql_features"));
        assert!(!is_system_table("orders"));
        assert!(!is_system_table("user_pg_data"));
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("orders").unwrap(), "\"orders\"");
        assert_eq!(
            quote_identifier("public.orders").unwrap(),
            "\"public\".\"orders\""
        );
        assert_eq!(quote_identifier("we\"ird").unwrap(), "\"we\"\"ird\"");
    }

    #[test]
    fn test_quote_identifier_rejects_bad_names() {
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("public.").is_err());
        assert!(quote_identifier("bad\nname").is_err());
    }
}
