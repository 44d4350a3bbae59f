//! Dropbox remote source
//!
//! Dropbox's `list_folder` API returns entries in no particular order, so a
//! single `list_changed_since` call drains `list_folder` and
//! `list_folder/continue` and returns one page sorted by `server_modified`
//! descending. Only files are mirrored: folders carry no modification time.
//!
//! Files are keyed by their stable Dropbox id (`id:...`), which survives
//! renames and moves, and are mirrored without a parent id. Their parent
//! kind is `Drive` at the top level and `Folder` below it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use kbsync_core::domain::{ParentKind, Provider, RemoteId, RemoteItem};
use kbsync_core::ports::{IRemoteSource, RemotePage, SourceError};

use crate::client::ProviderClient;
use crate::{remote_id, ProviderError};

/// Public Dropbox API base URL
pub const DROPBOX_BASE_URL: &str = "https://api.dropboxapi.com";

const LIST_LIMIT: u32 = 2000;

const SUPPORTED_PARENTS: &[ParentKind] = &[ParentKind::Folder, ParentKind::Drive];

// ============================================================================
// Dropbox API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ListFolderResult {
    #[serde(default)]
    entries: Vec<Entry>,
    cursor: String,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "lowercase")]
enum Entry {
    File(FileMetadata),
    Folder(serde_json::Value),
    Deleted(serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct FileMetadata {
    id: String,
    name: String,
    path_lower: Option<String>,
    path_display: Option<String>,
    server_modified: DateTime<Utc>,
}

impl FileMetadata {
    fn into_remote_item(self) -> Result<RemoteItem, ProviderError> {
        let path = self.path_lower.as_deref().unwrap_or_default();
        let parent_kind = if path.trim_start_matches('/').contains('/') {
            ParentKind::Folder
        } else {
            ParentKind::Drive
        };

        let content_ref = self
            .path_display
            .clone()
            .or(self.path_lower.clone())
            .unwrap_or_else(|| self.id.clone());

        Ok(
            RemoteItem::new(remote_id(self.id)?, parent_kind, self.server_modified)
                .with_mime_type(extension(&self.name))
                .with_name(self.name)
                .with_content_ref(content_ref),
        )
    }
}

/// Lowercased file extension, empty if none
fn extension(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => String::new(),
    }
}

// ============================================================================
// DropboxSource
// ============================================================================

/// `IRemoteSource` over the Dropbox v2 files API
pub struct DropboxSource {
    client: ProviderClient,
}

impl DropboxSource {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            client: ProviderClient::new(base_url, access_token)?,
        })
    }

    async fn list_all(&self) -> Result<Vec<RemoteItem>, ProviderError> {
        let mut result: ListFolderResult = self
            .client
            .send_json(self.client.request(Method::POST, "/2/files/list_folder").json(&json!({
                "path": "",
                "recursive": true,
                "include_deleted": false,
                "limit": LIST_LIMIT,
            })))
            .await?;

        let mut items = Vec::new();
        let mut pages: u32 = 1;
        loop {
            for entry in std::mem::take(&mut result.entries) {
                if let Entry::File(file) = entry {
                    items.push(file.into_remote_item()?);
                }
            }

            if !result.has_more {
                break;
            }

            pages += 1;
            result = self
                .client
                .send_json(
                    self.client
                        .request(Method::POST, "/2/files/list_folder/continue")
                        .json(&json!({ "cursor": result.cursor })),
                )
                .await?;
        }

        items.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        debug!(items = items.len(), pages, "Dropbox listing drained");
        Ok(items)
    }
}

#[async_trait]
impl IRemoteSource for DropboxSource {
    fn provider(&self) -> Provider {
        Provider::Dropbox
    }

    fn supported_parent_kinds(&self) -> &'static [ParentKind] {
        SUPPORTED_PARENTS
    }

    async fn list_changed_since(
        &self,
        _cursor: Option<&str>,
        _low_water_mark: DateTime<Utc>,
    ) -> Result<RemotePage, SourceError> {
        let items = self
            .list_all()
            .await
            .map_err(ProviderError::into_listing_error)?;
        Ok(RemotePage::last(items))
    }

    async fn fetch_item(&self, id: &RemoteId) -> Result<RemoteItem, SourceError> {
        let request = self
            .client
            .request(Method::POST, "/2/files/get_metadata")
            .json(&json!({ "path": id.as_str() }));

        let entry: Entry = match self.client.send_json(request).await {
            Ok(entry) => entry,
            // Lookup failures are reported as 409 with a `path/not_found` summary
            Err(ProviderError::Conflict(body)) if body.contains("not_found") => {
                return Err(SourceError::RemoteItemGone(id.clone()))
            }
            Err(e) => return Err(e.into_fetch_error(id)),
        };

        match entry {
            Entry::File(file) => file
                .into_remote_item()
                .map_err(|e| SourceError::RemoteUnavailable(e.to_string())),
            Entry::Deleted(_) | Entry::Folder(_) => Err(SourceError::RemoteItemGone(id.clone())),
        }
    }
}
