//! PostgreSQL connection pool management.

use super::{ConnectionConfig, PostgresSource};
use crate::Result;
use crate::error::DbQualityError;
use sqlx::{Executor, PgPool};

/// Default PostgreSQL port when the URL names none.
const DEFAULT_PORT: u16 = 5432;

impl PostgresSource {
    /// Creates a PostgreSQL source with a lazily connected pool.
    ///
    /// No connection is made until the first query; call
    /// [`test_connection`](crate::adapters::TabularSource::test_connection)
    /// to fail fast.
    ///
    /// # Errors
    /// Returns error if the connection string is malformed or the pool
    /// configuration is invalid.
    pub async fn new(connection_string: &str) -> Result<Self> {
        let config = Self::parse_connection_config(connection_string)?;
        let pool = Self::create_connection_pool(connection_string, &config)?;
        Ok(Self { pool, config })
    }

    /// Creates a source with a custom configuration.
    pub async fn with_config(connection_string: &str, config: ConnectionConfig) -> Result<Self> {
        config.validate()?;
        Self::parse_connection_config(connection_string)?;
        let pool = Self::create_connection_pool(connection_string, &config)?;
        Ok(Self { pool, config })
    }

    /// Parses connection string to extract configuration parameters.
    ///
    /// # Errors
    /// Returns error if the URL is malformed or not a PostgreSQL URL
    pub fn parse_connection_config(connection_string: &str) -> Result<ConnectionConfig> {
        if !connection_string.starts_with("postgres://")
            && !connection_string.starts_with("postgresql://")
        {
            return Err(DbQualityError::configuration(
                "Connection string must use postgres:// or postgresql:// scheme",
            ));
        }

        let mut config = ConnectionConfig::from_url(connection_string)?;
        if config.port.is_none() {
            config = config.with_port(DEFAULT_PORT);
        }
        config.validate()?;
        Ok(config)
    }

    /// Closes the connection pool gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn create_connection_pool(
        connection_string: &str,
        config: &ConnectionConfig,
    ) -> Result<PgPool> {
        let read_only = config.read_only;

        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(config.max_connections.min(100))
            .acquire_timeout(config.connect_timeout)
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    let app_name = format!("dbquality-{}", env!("CARGO_PKG_VERSION"));
                    conn.execute(format!("SET application_name = '{}'", app_name).as_str())
                        .await?;

                    if read_only {
                        conn.execute("SET default_transaction_read_only = on")
                            .await?;
                    }

                    // Timestamps without zone come back as naive UTC values
                    conn.execute("SET timezone = 'UTC'").await?;

                    Ok(())
                })
            })
            .connect_lazy(connection_string)
            .map_err(DbQualityError::connection_failed)?;

        tracing::debug!("Created PostgreSQL pool for {}", config);
        Ok(pool)
    }
}
