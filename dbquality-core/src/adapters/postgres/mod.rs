//! PostgreSQL tabular source.
//!
//! # Module Structure
//! - `connection`: Connection pool creation and session settings
//! - `type_mapping`: information_schema types to storage kinds
//! - `loading`: Table listing and `row_to_json` row loading
//!
//! # Security Guarantees
//! - Sessions run with `default_transaction_read_only = on`
//! - Connection strings are sanitized in error messages

mod connection;
mod loading;
mod type_mapping;

use super::{ConnectionConfig, SourceType, TabularSource};
use crate::{Dataset, Result};
use async_trait::async_trait;
use sqlx::PgPool;

pub use type_mapping::map_postgres_kind;

/// PostgreSQL source over a lazily connected pool.
pub struct PostgresSource {
    /// Read-only connection pool
    pub pool: PgPool,
    /// Connection configuration (no credentials)
    pub config: ConnectionConfig,
}

impl std::fmt::Debug for PostgresSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresSource")
            .field("config", &self.config)
            .field("pool_size", &self.pool.size())
            .field("pool_idle", &self.pool.num_idle())
            .finish()
    }
}

#[async_trait]
impl TabularSource for PostgresSource {
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
        SourceType::PostgreSQL
    }

    fn connection_config(&self) -> ConnectionConfig {
        self.config.clone()
    }
}
