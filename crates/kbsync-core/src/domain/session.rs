//! Reconciliation session and summary types
//!
//! A `SyncSession` is the ephemeral state of one reconciliation invocation
//! for a (user, provider) pair. A `SyncSummary` is what the invocation
//! reports when it finishes, successfully or not.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::newtypes::{Provider, SessionId, UserId};

// ============================================================================
// SyncPhase
// ============================================================================

/// Phase of a reconciliation invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    /// Paginating the remote listing
    Listing,
    /// Writing supported items to the mirror
    Upsert,
    /// Re-fetching children of updated items
    CascadeCheck,
    /// Re-fetching root and orphan rows
    RootValidity,
    /// Deleting marked rows
    Deletion,
    /// Persisting the low-water mark and committing
    Commit,
}

impl SyncPhase {
    /// Returns the snake_case name of the phase
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncPhase::Listing => "listing",
            SyncPhase::Upsert => "upsert",
            SyncPhase::CascadeCheck => "cascade_check",
            SyncPhase::RootValidity => "root_validity",
            SyncPhase::Deletion => "deletion",
            SyncPhase::Commit => "commit",
        }
    }
}

impl std::fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SyncSession
// ============================================================================

/// Ephemeral state of one reconciliation invocation
///
/// Carries the low-water mark read when the invocation started and the
/// pagination cursor of the listing phase. Nothing in here is persisted;
/// only the committed low-water mark survives the invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSession {
    id: SessionId,
    user_id: UserId,
    provider: Provider,
    started_at: DateTime<Utc>,
    low_water_mark: DateTime<Utc>,
    cursor: Option<String>,
    pages_fetched: u32,
}

impl SyncSession {
    /// Starts a new session at the given low-water mark
    pub fn new(user_id: UserId, provider: Provider, low_water_mark: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            user_id,
            provider,
            started_at: Utc::now(),
            low_water_mark,
            cursor: None,
            pages_fetched: 0,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Low-water mark read from the mirror at session start
    pub fn low_water_mark(&self) -> DateTime<Utc> {
        self.low_water_mark
    }

    /// Cursor to pass to the next listing call, `None` for the first page
    pub fn cursor(&self) -> Option<&str> {
        self.cursor.as_deref()
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    /// Records a fetched page and moves the cursor forward
    pub fn advance(&mut self, next_cursor: Option<String>) {
        self.pages_fetched += 1;
        self.cursor = next_cursor;
    }
}

// ============================================================================
// SyncSummary
// ============================================================================

/// Outcome of one reconciliation invocation
///
/// This is also the notification record handed to `INotificationService`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSummary {
    pub provider: Provider,
    pub user_id: UserId,
    pub created_count: u64,
    pub updated_count: u64,
    pub deleted_count: u64,
    pub success: bool,
    /// Error message when `success` is false
    pub error: Option<String>,
    /// Phase that failed when `success` is false
    pub failed_phase: Option<SyncPhase>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncSummary {
    /// Builds a successful summary finishing now
    pub fn succeeded(
        provider: Provider,
        user_id: UserId,
        started_at: DateTime<Utc>,
        created_count: u64,
        updated_count: u64,
        deleted_count: u64,
    ) -> Self {
        Self {
            provider,
            user_id,
            created_count,
            updated_count,
            deleted_count,
            success: true,
            error: None,
            failed_phase: None,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Builds a failed summary finishing now, with all counts at zero
    ///
    /// Counts are zero because a failed invocation rolls back every change.
    pub fn failed(
        provider: Provider,
        user_id: UserId,
        started_at: DateTime<Utc>,
        phase: Option<SyncPhase>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            user_id,
            created_count: 0,
            updated_count: 0,
            deleted_count: 0,
            success: false,
            error: Some(error.into()),
            failed_phase: phase,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Returns true if the invocation changed nothing
    pub fn is_noop(&self) -> bool {
        self.created_count == 0 && self.updated_count == 0 && self.deleted_count == 0
    }

    /// Wall-clock duration of the invocation
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}
