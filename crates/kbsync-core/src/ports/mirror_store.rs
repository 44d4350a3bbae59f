//! Local mirror store port (driven/secondary port)
//!
//! This module defines the persistence interface of the reconciler. A store
//! opens one session per invocation, scoped to a (provider, owner) pair.
//! Every write in the session, and every read after the first write,
//! happens inside a single storage transaction that is either committed or
//! rolled back.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because error types are adapter-specific.
//! - Sessions are consumed by `commit`/`rollback`; dropping an uncommitted
//!   session must roll it back.
//! - Uniqueness of (provider, owner, remote id) is enforced by the store;
//!   a uniqueness conflict on insert is resolved as an update.

use chrono::{DateTime, Utc};

use crate::domain::{Provider, RemoteId, SyncFile, UserId};

/// The (provider, owner) pair a mirror session operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MirrorScope {
    pub provider: Provider,
    pub owner: UserId,
}

impl MirrorScope {
    pub fn new(provider: Provider, owner: UserId) -> Self {
        Self { provider, owner }
    }
}

impl std::fmt::Display for MirrorScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.provider, self.owner)
    }
}

/// Factory for transaction-scoped mirror sessions
#[async_trait::async_trait]
pub trait IMirrorStore: Send + Sync {
    /// Opens a new session (and storage transaction) for `scope`
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started.
    async fn begin(&self, scope: MirrorScope) -> anyhow::Result<Box<dyn IMirrorSession>>;
}

/// A transaction over the mirror rows of one (provider, owner) scope
#[async_trait::async_trait]
pub trait IMirrorSession: Send {
    /// Inserts or updates the row keyed by the file's remote id
    ///
    /// Returns `true` if a new row was created, `false` if an existing row
    /// was updated.
    async fn upsert(&mut self, file: &SyncFile) -> anyhow::Result<bool>;

    /// Rows whose parent is `parent_remote_id`
    async fn get_children(&mut self, parent_remote_id: &RemoteId) -> anyhow::Result<Vec<SyncFile>>;

    /// Rows without a parent
    async fn get_roots(&mut self) -> anyhow::Result<Vec<SyncFile>>;

    /// Rows whose parent id names a row that does not exist in the scope
    async fn get_orphans(&mut self) -> anyhow::Result<Vec<SyncFile>>;

    /// Deletes the rows with the given remote ids, returning the number removed
    async fn delete_many(&mut self, remote_ids: &[RemoteId]) -> anyhow::Result<u64>;

    /// Rows with the given remote ids (missing ids are skipped)
    async fn get_by_ids(&mut self, remote_ids: &[RemoteId]) -> anyhow::Result<Vec<SyncFile>>;

    /// All rows in the scope
    async fn get_all(&mut self) -> anyhow::Result<Vec<SyncFile>>;

    /// Persisted low-water mark, the Unix epoch if none was ever committed
    async fn low_water_mark(&mut self) -> anyhow::Result<DateTime<Utc>>;

    /// Stages a new low-water mark, persisted on commit
    async fn set_low_water_mark(&mut self, low_water_mark: DateTime<Utc>) -> anyhow::Result<()>;

    /// Commits every change made through this session
    async fn commit(self: Box<Self>) -> anyhow::Result<()>;

    /// Discards every change made through this session
    async fn rollback(self: Box<Self>) -> anyhow::Result<()>;
}
