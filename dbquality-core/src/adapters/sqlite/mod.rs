//! SQLite tabular source.
//!
//! # Module Structure
//! - `connection`: Connection handling (single read-only connection)
//! - `type_mapping`: Declared column types to [`DataKind`](crate::models::DataKind)
//! - `loading`: Table listing and row loading
//!
//! # Security Guarantees
//! - All operations are read-only (SELECT/PRAGMA only)
//! - File databases are opened in read-only mode

pub mod connection;
pub mod loading;
pub mod type_mapping;

use super::{ConnectionConfig, SourceType, TabularSource};
use crate::{Dataset, Result};
use async_trait::async_trait;
use sqlx::SqlitePool;

pub use connection::SqliteTarget;
pub use type_mapping::map_sqlite_kind;

/// SQLite source over a single-connection pool.
pub struct SqliteSource {
    /// Connection pool (single connection for SQLite)
    pub pool: SqlitePool,
    /// Connection configuration
    pub config: ConnectionConfig,
    /// Database the pool was opened against
    pub target: connection::SqliteTarget,
}

impl std::fmt::Debug for SqliteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSource")
            .field("config", &self.config)
            .field("is_in_memory", &self.is_in_memory())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TabularSource for SqliteSource {
    async fn test_connection(&self) -> Result<()> {
        let result: i32 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(crate::error::DbQualityError::connection_failed)?;

        if result != 1 {
            return Err(crate::error::DbQualityError::configuration(
                "Basic connectivity test failed: unexpected result",
            ));
        }
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        loading::list_tables(&self.pool).await
    }

    async fn load_table(&self, table: &str, limit: Option<u32>) -> Result<Dataset> {
        loading::load_table(&self.pool, table, limit).await
    }

    async fn load_query(&self, name: &str, query: &str) -> Result<Dataset> {
        loading::load_query(&self.pool, name, query).await
    }

    fn source_type(&self) -> SourceType {
        SourceType::SQLite
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }
}
