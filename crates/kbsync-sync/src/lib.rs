//! kbsync Sync - Incremental reconciliation engine
//!
//! Provides:
//! - Paginated listing with low-water-mark early stop
//! - Per-(user, provider) reconciliation against the local mirror
//! - A bounded, time-limited scheduler over configured connections
//!
//! ## Modules
//!
//! - [`listing`] - Pagination loop over an `IRemoteSource`
//! - [`reconciler`] - Listing, upsert, cascade, root validity, deletion and commit phases
//! - [`scheduler`] - Periodic worker pool driving the reconciler
//! - [`handoff`] - Ingestion sinks and notifier implementations

pub mod handoff;
pub mod listing;
pub mod reconciler;
pub mod scheduler;

use std::time::Duration;

use kbsync_core::domain::RemoteId;
use kbsync_core::ports::SourceError;
use thiserror::Error;

pub use reconciler::Reconciler;
pub use scheduler::{Scheduler, SyncTarget};

/// Errors that abort a reconciliation invocation
#[derive(Debug, Error)]
pub enum SyncError {
    /// The remote could not be reached; retried at the next schedule
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote reports an item missing
    #[error("Remote item gone: {0}")]
    RemoteItemGone(RemoteId),

    /// Conflicting write on the mirror
    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    /// The invocation exceeded its time limit and was rolled back
    #[error("Session timed out after {0:?}")]
    SessionTimeout(Duration),

    /// Any other mirror store failure
    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl From<SourceError> for SyncError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::RemoteUnavailable(msg) => SyncError::RemoteUnavailable(msg),
            SourceError::RemoteItemGone(id) => SyncError::RemoteItemGone(id),
        }
    }
}
