//! SQLite implementation of IMirrorStore
//!
//! Each [`SqliteMirrorSession`] wraps one SQLite transaction scoped to a
//! (provider, owner) pair. The transaction is opened lazily on the first
//! write; reads issued before that run directly on the pool, so listing and
//! re-validating an unchanged mirror never hold the database write lock.
//!
//! SQLite admits a single writer. Sessions of one store take the store's
//! writer lock before opening their transaction and keep it until commit,
//! rollback or drop, so concurrent sessions queue in order instead of
//! failing on the busy timeout. The wait happens inside the caller's
//! session timeout.
//!
//! Opening the transaction starts with a write to `sync_state`, which makes
//! SQLite take its write lock up front rather than on a read-to-write
//! upgrade.
//!
//! Dropping a session with an open transaction rolls it back.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tokio::sync::{Mutex, OwnedMutexGuard};

use kbsync_core::domain::{RemoteId, SyncFile};
use kbsync_core::ports::{IMirrorSession, IMirrorStore, MirrorScope};

use crate::rows::{format_datetime, parse_datetime, sync_file_from_row};
use crate::CacheError;

/// Maximum number of ids bound in a single `IN (...)` clause
const MAX_BIND_IDS: usize = 500;

/// SQLite-backed mirror store
///
/// Cheap to clone; clones share the pool and the writer lock.
#[derive(Clone)]
pub struct SqliteMirrorStore {
    pool: SqlitePool,
    writer: Arc<Mutex<()>>,
}

impl SqliteMirrorStore {
    /// Creates a new store over the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// Opens a concrete session without boxing it
    pub fn session(&self, scope: MirrorScope) -> SqliteMirrorSession {
        SqliteMirrorSession {
            pool: self.pool.clone(),
            scope,
            tx: None,
            writer: self.writer.clone(),
            write_guard: None,
        }
    }
}

#[async_trait::async_trait]
impl IMirrorStore for SqliteMirrorStore {
    async fn begin(&self, scope: MirrorScope) -> anyhow::Result<Box<dyn IMirrorSession>> {
        tracing::trace!(scope = %scope, "Opening mirror session");
        Ok(Box::new(self.session(scope)))
    }
}

/// A transaction over the mirror rows of one (provider, owner) scope
pub struct SqliteMirrorSession {
    pool: SqlitePool,
    scope: MirrorScope,
    // Dropped before the guard, so the lock outlives the transaction
    tx: Option<Transaction<'static, Sqlite>>,
    writer: Arc<Mutex<()>>,
    write_guard: Option<OwnedMutexGuard<()>>,
}

impl SqliteMirrorSession {
    /// Returns the open transaction, starting it if needed
    ///
    /// Starting waits for the store's writer lock.
    async fn tx(&mut self) -> Result<&mut Transaction<'static, Sqlite>, CacheError> {
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => {
                if self.write_guard.is_none() {
                    let guard = match self.writer.clone().try_lock_owned() {
                        Ok(guard) => guard,
                        Err(_) => {
                            tracing::debug!(scope = %self.scope, "Waiting for mirror writer lock");
                            self.writer.clone().lock_owned().await
                        }
                    };
                    self.write_guard = Some(guard);
                }
                let mut tx = self.pool.begin().await?;
                sqlx::query(
                    "INSERT OR IGNORE INTO sync_state (provider, owner_user_id, low_water_mark) \
                     VALUES (?, ?, NULL)",
                )
                .bind(self.scope.provider.as_str())
                .bind(self.scope.owner.to_string())
                .execute(&mut *tx)
                .await?;
                tracing::trace!(scope = %self.scope, "Mirror transaction started");
                tx
            }
        };
        Ok(self.tx.insert(tx))
    }

    fn ensure_in_scope(&self, file: &SyncFile) -> Result<(), CacheError> {
        if file.provider() != self.scope.provider || file.owner_user_id() != &self.scope.owner {
            return Err(CacheError::OutOfScope(format!(
                "{}/{} row {} written through {} session",
                file.provider(),
                file.owner_user_id(),
                file.remote_id(),
                self.scope
            )));
        }
        Ok(())
    }

    async fn fetch_files(
        &mut self,
        sql: &str,
        extra_binds: &[String],
    ) -> Result<Vec<SyncFile>, CacheError> {
        let mut query = sqlx::query(sql)
            .bind(self.scope.provider.as_str())
            .bind(self.scope.owner.to_string());
        for bind in extra_binds {
            query = query.bind(bind);
        }

        // Read outside any transaction until the session has written something
        let rows = match self.tx.as_mut() {
            Some(tx) => query.fetch_all(&mut **tx).await?,
            None => query.fetch_all(&self.pool).await?,
        };
        rows.iter().map(sync_file_from_row).collect()
    }
}

// ============================================================================
// Row writes
// ============================================================================

async fn update_row(conn: &mut SqliteConnection, file: &SyncFile) -> Result<u64, CacheError> {
    let result = sqlx::query(
        "UPDATE sync_files \
         SET parent_remote_id = ?, name = ?, mime_type = ?, last_modified = ?, last_synced_at = ? \
         WHERE provider = ? AND owner_user_id = ? AND remote_id = ?",
    )
    .bind(file.parent_remote_id().map(|p| p.as_str()))
    .bind(file.name())
    .bind(file.mime_type())
    .bind(format_datetime(&file.last_modified()))
    .bind(format_datetime(&file.last_synced_at()))
    .bind(file.provider().as_str())
    .bind(file.owner_user_id().to_string())
    .bind(file.remote_id().as_str())
    .execute(&mut *conn)
    .await?;
    Ok(result.rows_affected())
}

async fn insert_row(conn: &mut SqliteConnection, file: &SyncFile) -> Result<(), CacheError> {
    sqlx::query(
        "INSERT INTO sync_files \
         (provider, owner_user_id, remote_id, parent_remote_id, name, mime_type, \
          last_modified, last_synced_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(file.provider().as_str())
    .bind(file.owner_user_id().to_string())
    .bind(file.remote_id().as_str())
    .bind(file.parent_remote_id().map(|p| p.as_str()))
    .bind(file.name())
    .bind(file.mime_type())
    .bind(format_datetime(&file.last_modified()))
    .bind(format_datetime(&file.last_synced_at()))
    .execute(&mut *conn)
    .await?;
    Ok(())
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

// ============================================================================
// IMirrorSession implementation
// ============================================================================

#[async_trait::async_trait]
impl IMirrorSession for SqliteMirrorSession {
    async fn upsert(&mut self, file: &SyncFile) -> anyhow::Result<bool> {
        self.ensure_in_scope(file)?;
        let tx = self.tx().await?;

        if update_row(&mut **tx, file).await? > 0 {
            tracing::trace!(remote_id = %file.remote_id(), "Updated mirror row");
            return Ok(false);
        }

        match insert_row(&mut **tx, file).await {
            Ok(()) => {
                tracing::trace!(remote_id = %file.remote_id(), "Inserted mirror row");
                Ok(true)
            }
            Err(CacheError::StorageConflict(msg)) => {
                tracing::debug!(
                    remote_id = %file.remote_id(),
                    conflict = %msg,
                    "Insert hit uniqueness constraint, retrying as update"
                );
                update_row(&mut **tx, file).await?;
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_children(&mut self, parent_remote_id: &RemoteId) -> anyhow::Result<Vec<SyncFile>> {
        Ok(self
            .fetch_files(
                "SELECT * FROM sync_files \
                 WHERE provider = ? AND owner_user_id = ? AND parent_remote_id = ? \
                 ORDER BY remote_id",
                &[parent_remote_id.as_str().to_string()],
            )
            .await?)
    }

    async fn get_roots(&mut self) -> anyhow::Result<Vec<SyncFile>> {
        Ok(self
            .fetch_files(
                "SELECT * FROM sync_files \
                 WHERE provider = ? AND owner_user_id = ? AND parent_remote_id IS NULL \
                 ORDER BY remote_id",
                &[],
            )
            .await?)
    }

    async fn get_orphans(&mut self) -> anyhow::Result<Vec<SyncFile>> {
        Ok(self
            .fetch_files(
                "SELECT * FROM sync_files f \
                 WHERE f.provider = ? AND f.owner_user_id = ? \
                   AND f.parent_remote_id IS NOT NULL \
                   AND NOT EXISTS ( \
                     SELECT 1 FROM sync_files p \
                     WHERE p.provider = f.provider \
                       AND p.owner_user_id = f.owner_user_id \
                       AND p.remote_id = f.parent_remote_id) \
                 ORDER BY f.remote_id",
                &[],
            )
            .await?)
    }

    async fn delete_many(&mut self, remote_ids: &[RemoteId]) -> anyhow::Result<u64> {
        if remote_ids.is_empty() {
            return Ok(0);
        }

        let provider = self.scope.provider.as_str();
        let owner = self.scope.owner.to_string();
        let tx = self.tx().await?;

        let mut deleted = 0;
        for chunk in remote_ids.chunks(MAX_BIND_IDS) {
            let sql = format!(
                "DELETE FROM sync_files WHERE provider = ? AND owner_user_id = ? \
                 AND remote_id IN ({})",
                placeholders(chunk.len())
            );
            let mut query = sqlx::query(&sql).bind(provider).bind(&owner);
            for id in chunk {
                query = query.bind(id.as_str());
            }
            deleted += query
                .execute(&mut **tx)
                .await
                .map_err(CacheError::from)?
                .rows_affected();
        }

        tracing::debug!(scope = %self.scope, requested = remote_ids.len(), deleted, "Deleted mirror rows");
        Ok(deleted)
    }

    async fn get_by_ids(&mut self, remote_ids: &[RemoteId]) -> anyhow::Result<Vec<SyncFile>> {
        let mut files = Vec::with_capacity(remote_ids.len());
        for chunk in remote_ids.chunks(MAX_BIND_IDS) {
            let sql = format!(
                "SELECT * FROM sync_files WHERE provider = ? AND owner_user_id = ? \
                 AND remote_id IN ({}) ORDER BY remote_id",
                placeholders(chunk.len())
            );
            let binds: Vec<String> = chunk.iter().map(|id| id.as_str().to_string()).collect();
            files.extend(self.fetch_files(&sql, &binds).await?);
        }
        Ok(files)
    }

    async fn get_all(&mut self) -> anyhow::Result<Vec<SyncFile>> {
        Ok(self
            .fetch_files(
                "SELECT * FROM sync_files WHERE provider = ? AND owner_user_id = ? \
                 ORDER BY remote_id",
                &[],
            )
            .await?)
    }

    async fn low_water_mark(&mut self) -> anyhow::Result<DateTime<Utc>> {
        let sql = "SELECT low_water_mark FROM sync_state WHERE provider = ? AND owner_user_id = ?";
        let provider = self.scope.provider.as_str();
        let owner = self.scope.owner.to_string();

        let stored: Option<Option<String>> = match self.tx.as_mut() {
            Some(tx) => {
                sqlx::query_scalar(sql)
                    .bind(provider)
                    .bind(&owner)
                    .fetch_optional(&mut **tx)
                    .await?
            }
            None => {
                sqlx::query_scalar(sql)
                    .bind(provider)
                    .bind(&owner)
                    .fetch_optional(&self.pool)
                    .await?
            }
        };

        match stored.flatten() {
            Some(s) => Ok(parse_datetime(&s)?),
            None => Ok(DateTime::<Utc>::UNIX_EPOCH),
        }
    }

    async fn set_low_water_mark(&mut self, low_water_mark: DateTime<Utc>) -> anyhow::Result<()> {
        let provider = self.scope.provider.as_str();
        let owner = self.scope.owner.to_string();
        let tx = self.tx().await?;

        sqlx::query(
            "INSERT INTO sync_state (provider, owner_user_id, low_water_mark, updated_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT (provider, owner_user_id) DO UPDATE SET \
               low_water_mark = excluded.low_water_mark, updated_at = excluded.updated_at",
        )
        .bind(provider)
        .bind(&owner)
        .bind(format_datetime(&low_water_mark))
        .bind(format_datetime(&Utc::now()))
        .execute(&mut **tx)
        .await
        .map_err(CacheError::from)?;

        tracing::trace!(scope = %self.scope, low_water_mark = %low_water_mark, "Staged low-water mark");
        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> anyhow::Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.commit().await.map_err(CacheError::from)?;
            tracing::debug!(scope = %self.scope, "Mirror session committed");
        }
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> anyhow::Result<()> {
        if let Some(tx) = self.tx.take() {
            tx.rollback().await.map_err(CacheError::from)?;
            tracing::debug!(scope = %self.scope, "Mirror session rolled back");
        }
        Ok(())
    }
}
