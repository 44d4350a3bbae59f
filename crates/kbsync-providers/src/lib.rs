//! kbsync Providers - Remote source adapters
//!
//! Provides one async `IRemoteSource` implementation per supported provider:
//! - Notion pages via the public search API
//! - Google Drive files via Drive v3
//! - Dropbox files via the v2 files API
//! - GitHub repositories via the REST API
//! - OneDrive/SharePoint items via the Microsoft Graph delta API
//!
//! ## Modules
//!
//! - [`client`] - Authenticated HTTP client shared by every adapter
//! - [`notion`], [`google`], [`dropbox`], [`github`], [`azure`] - Provider adapters
//! - [`registry`] - Maps a `Provider` and an access token to an adapter

pub mod azure;
pub mod client;
pub mod dropbox;
pub mod github;
pub mod google;
pub mod notion;
pub mod registry;

use std::time::Duration;

use kbsync_core::domain::RemoteId;
use kbsync_core::ports::SourceError;
use thiserror::Error;

pub use registry::ProviderRegistry;

/// Errors that can occur when communicating with a provider API
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The requested resource existed but was permanently removed
    #[error("Gone: {0}")]
    Gone(String),

    /// The request conflicted with remote state (Dropbox reports lookup errors this way)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded
    #[error("Too many requests, retry after {retry_after:?}")]
    TooManyRequests {
        /// Duration the provider asked us to wait
        retry_after: Duration,
    },

    /// A server-side error occurred (5xx)
    #[error("Server error: {0}")]
    ServerError(String),

    /// Any other non-success status
    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Returns true if the provider reported the resource missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_) | ProviderError::Gone(_))
    }

    /// Converts a listing failure into the port-level error
    pub fn into_listing_error(self) -> SourceError {
        SourceError::RemoteUnavailable(self.to_string())
    }

    /// Converts a single-item fetch failure into the port-level error
    ///
    /// Not-found statuses become `RemoteItemGone`; everything else is
    /// `RemoteUnavailable`.
    pub fn into_fetch_error(self, remote_id: &RemoteId) -> SourceError {
        if self.is_not_found() {
            SourceError::RemoteItemGone(remote_id.clone())
        } else {
            SourceError::RemoteUnavailable(self.to_string())
        }
    }
}

/// Builds a `RemoteId` from a provider-supplied string
pub(crate) fn remote_id(raw: impl Into<String>) -> Result<RemoteId, ProviderError> {
    let raw = raw.into();
    RemoteId::new(raw).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
}
