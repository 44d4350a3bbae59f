//! Remote source port (driven/secondary port)
//!
//! This module defines the interface every provider adapter implements:
//! a paginated, time-filterable listing plus single-item re-fetch.
//!
//! ## Design Notes
//!
//! - Uses `#[async_trait]` for async trait methods.
//! - Errors are typed (`SourceError`) rather than `anyhow` because the
//!   reconciler branches on them: `RemoteItemGone` is a deletion signal,
//!   `RemoteUnavailable` aborts root re-validation.
//! - Adapters return full pages unfiltered; the listing loop applies the
//!   low-water mark and the early-stop rule.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{ParentKind, Provider, RemoteId, RemoteItem};

/// Failure reported by a remote source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Network, auth, throttling or server failure; retryable next schedule
    #[error("remote unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote reports the item does not exist
    #[error("remote item gone: {0}")]
    RemoteItemGone(RemoteId),
}

impl SourceError {
    /// Returns true if the error is transient
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::RemoteUnavailable(_))
    }
}

/// One page of a remote listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemotePage {
    /// Items in provider order (descending modification time)
    pub items: Vec<RemoteItem>,
    /// Cursor for the next page
    pub next_cursor: Option<String>,
    /// Whether the provider has more pages
    pub has_more: bool,
}

impl RemotePage {
    /// Creates a final page with the given items
    pub fn last(items: Vec<RemoteItem>) -> Self {
        Self {
            items,
            next_cursor: None,
            has_more: false,
        }
    }

    /// Creates a page followed by another one at `cursor`
    pub fn with_next(items: Vec<RemoteItem>, cursor: impl Into<String>) -> Self {
        Self {
            items,
            next_cursor: Some(cursor.into()),
            has_more: true,
        }
    }
}

/// Port for listing and fetching items of one provider connection
#[async_trait::async_trait]
pub trait IRemoteSource: Send + Sync {
    /// Provider this source talks to
    fn provider(&self) -> Provider;

    /// Parent kinds that count as first-class containers for this provider
    fn supported_parent_kinds(&self) -> &'static [ParentKind];

    /// Lists one page of items changed since `low_water_mark`
    ///
    /// # Arguments
    ///
    /// * `cursor` - `None` for the first page, then the previous page's `next_cursor`
    /// * `low_water_mark` - Modification time of the last successful sync
    ///
    /// # Errors
    ///
    /// Returns `SourceError::RemoteUnavailable` on any transport or API failure.
    async fn list_changed_since(
        &self,
        cursor: Option<&str>,
        low_water_mark: DateTime<Utc>,
    ) -> Result<RemotePage, SourceError>;

    /// Re-fetches a single item by its remote id
    ///
    /// # Errors
    ///
    /// Returns `SourceError::RemoteItemGone` when the provider reports the
    /// item missing, `SourceError::RemoteUnavailable` otherwise.
    async fn fetch_item(&self, remote_id: &RemoteId) -> Result<RemoteItem, SourceError>;

    /// Returns true if the item should be mirrored
    ///
    /// An item is supported when it is neither trashed nor archived and its
    /// parent is one of the provider's first-class container kinds.
    fn classify_supported(&self, item: &RemoteItem) -> bool {
        item.is_live() && self.supported_parent_kinds().contains(&item.parent_kind)
    }
}
