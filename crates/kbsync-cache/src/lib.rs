//! kbsync Cache - Local mirror persistence
//!
//! SQLite-based storage for:
//! - Mirror rows, one per known remote item per (provider, owner)
//! - Low-water marks per (provider, owner)
//! - The sync notification log
//!
//! ## Architecture
//!
//! This crate implements the `IMirrorStore` and `INotificationService` ports
//! from `kbsync-core` using SQLite as the storage backend. It is a driven
//! (secondary) adapter in the hexagonal architecture.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Connection pool with migration support
//! - [`SqliteMirrorStore`] - Transaction-scoped `IMirrorStore` implementation
//! - [`SqliteNotificationLog`] - Persistent `INotificationService` implementation
//! - [`CacheError`] - Error types for cache operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::path::Path;
//! use kbsync_cache::{DatabasePool, SqliteMirrorStore};
//! use kbsync_core::domain::{Provider, UserId};
//! use kbsync_core::ports::{IMirrorStore, MirrorScope};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let pool = DatabasePool::new(Path::new("/home/user/.local/share/kbsync/kbsync.db")).await?;
//! let store = SqliteMirrorStore::new(pool.pool().clone());
//! let mut session = store.begin(MirrorScope::new(Provider::Notion, UserId::new())).await?;
//! let roots = session.get_roots().await?;
//! session.commit().await?;
//! # Ok(())
//! # }
//! ```

pub mod mirror;
pub mod notifications;
pub mod pool;

mod rows;

pub use mirror::{SqliteMirrorSession, SqliteMirrorStore};
pub use notifications::SqliteNotificationLog;
pub use pool::DatabasePool;

/// Errors that can occur during cache operations
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A database query failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Schema migration failed
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Serialization or deserialization of domain types failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An insert hit the (provider, owner, remote id) uniqueness constraint
    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    /// A row outside the session's (provider, owner) scope was written
    #[error("Out of scope: {0}")]
    OutOfScope(String),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                CacheError::StorageConflict(db.message().to_string())
            }
            other => CacheError::QueryFailed(other.to_string()),
        }
    }
}
