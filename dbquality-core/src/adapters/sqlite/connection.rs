//! SQLite connection handling.
//!
//! Accepted forms:
//! - `sqlite:///abs/path.db`, `sqlite://./relative.db`, `sqlite:data.db`
//! - a bare path ending in `.db`, `.sqlite` or `.sqlite3`
//! - `sqlite::memory:` or `:memory:`
//!
//! Query parameters on a `sqlite:` URL are ignored; file databases are
//! always opened read-only.

use super::{ConnectionConfig, SqliteSource};
use crate::Result;
use crate::error::DbQualityError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::{Path, PathBuf};

const FILE_EXTENSIONS: [&str; 3] = ["db", "sqlite", "sqlite3"];

/// Where a SQLite connection string points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqliteTarget {
    /// Private in-memory database
    Memory,
    /// Database file on disk
    File(PathBuf),
}

impl SqliteTarget {
    /// Parses a connection string.
    ///
    /// # Errors
    /// Returns a configuration error for strings that are neither a
    /// `sqlite:` URL, a database file path nor `:memory:`.
    pub fn parse(connection_string: &str) -> Result<Self> {
        let trimmed = connection_string.trim();
        if trimmed == ":memory:" {
            return Ok(Self::Memory);
        }

        if let Some(rest) = trimmed.strip_prefix("sqlite:") {
            let rest = rest.strip_prefix("//").unwrap_or(rest);
            let path = rest.split('?').next().unwrap_or_default();
            return match path {
                ":memory:" => Ok(Self::Memory),
                "" => Err(DbQualityError::configuration(
                    "SQLite connection string has no database path",
                )),
                _ => Ok(Self::File(PathBuf::from(path))),
            };
        }

        let has_db_extension = Path::new(trimmed)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FILE_EXTENSIONS.contains(&ext));
        if has_db_extension {
            return Ok(Self::File(PathBuf::from(trimmed)));
        }

        Err(DbQualityError::configuration(
            "Invalid SQLite connection string format: expected sqlite:// URL, file path, or :memory:",
        ))
    }

    /// Name used in logs and the connection config.
    pub fn database_name(&self) -> String {
        match self {
            Self::Memory => ":memory:".to_string(),
            Self::File(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "main".to_string()),
        }
    }

    fn connect_options(&self) -> SqliteConnectOptions {
        match self {
            Self::Memory => SqliteConnectOptions::new().in_memory(true),
            // Missing files are an error, never created
            Self::File(path) => SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(false)
                .read_only(true),
        }
    }
}

impl SqliteSource {
    /// Opens a SQLite source from a connection string.
    ///
    /// # Errors
    /// Returns error if:
    /// - Connection string format is invalid
    /// - Database file does not exist or cannot be opened
    pub async fn new(connection_string: &str) -> Result<Self> {
        let target = SqliteTarget::parse(connection_string)?;
        let config = ConnectionConfig::new("localhost")
            .with_database(target.database_name())
            .with_max_connections(1);
        let pool = open_pool(&target, &config).await?;

        Ok(Self {
            pool,
            config,
            target,
        })
    }

    /// Checks if the connection is to an in-memory database.
    pub fn is_in_memory(&self) -> bool {
        self.target == SqliteTarget::Memory
    }

    /// Closes the connection gracefully.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn open_pool(target: &SqliteTarget, config: &ConnectionConfig) -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(config.connect_timeout)
        .connect_with(target.connect_options())
        .await
        .map_err(DbQualityError::connection_failed)?;

    tracing::debug!("Opened SQLite database {}", config);
    Ok(pool)
}
