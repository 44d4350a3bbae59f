//! SQLite pool for the mirror database
//!
//! File databases run in WAL mode with several connections so the CLI can
//! read while the daemon holds a write session. In-memory databases exist
//! only inside one connection, so their pool is capped at a single
//! connection and every session on it is serialized.
//!
//! The schema is applied on every open; all statements are
//! `CREATE ... IF NOT EXISTS`.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use crate::CacheError;

const SCHEMA: &str = include_str!("migrations/20260301_initial.sql");

/// Connections kept for a file database
const FILE_MAX_CONNECTIONS: u32 = 8;

/// How long a writer waits for a write lock held by another process or store
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle to the mirror database
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
    location: String,
}

impl DatabasePool {
    /// Opens (creating if needed) the database file at `db_path`
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    ///
    /// `CacheError::ConnectionFailed` when the directory or file cannot be
    /// opened, `CacheError::MigrationFailed` when the schema cannot be applied.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        Self::with_busy_timeout(db_path, BUSY_TIMEOUT).await
    }

    /// Like [`DatabasePool::new`] with a custom SQLite busy timeout
    pub async fn with_busy_timeout(
        db_path: &Path,
        busy_timeout: Duration,
    ) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!(
                    "cannot create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout);

        let pool_options = SqlitePoolOptions::new().max_connections(FILE_MAX_CONNECTIONS);
        let db = Self::open(pool_options, options, db_path.display().to_string()).await?;
        info!(path = %db.location, "Mirror database ready");
        Ok(db)
    }

    /// Opens a private in-memory database, used by tests and dry runs
    pub async fn in_memory() -> Result<Self, CacheError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| CacheError::ConnectionFailed(e.to_string()))?;
        // The database dies with its connection, so that connection is never reaped
        let pool_options = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
        let db = Self::open(pool_options, options, ":memory:".to_string()).await?;
        debug!("In-memory mirror database ready");
        Ok(db)
    }

    async fn open(
        pool_options: SqlitePoolOptions,
        options: SqliteConnectOptions,
        location: String,
    ) -> Result<Self, CacheError> {
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("{location}: {e}")))?;

        sqlx::raw_sql(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| CacheError::MigrationFailed(format!("{location}: {e}")))?;

        Ok(Self { pool, location })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// File path of the database, or `:memory:`
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Waits for checked-out connections to return, then closes the pool
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
