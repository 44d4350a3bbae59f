//! OneDrive / SharePoint remote source over Microsoft Graph
//!
//! Listing uses the delta query (`GET /me/drive/root/delta`) without a saved
//! delta token, following `@odata.nextLink` until the last page. Delta
//! results are not ordered by modification time, so every page is drained
//! inside one `list_changed_since` call and the result is returned as a single
//! page sorted descending.
//!
//! ## Parent mapping
//!
//! - Parent path `/drive/root:` means the item lives at the top of the drive:
//!   `ParentKind::Drive`, no parent id.
//! - Any other parent is a folder: `ParentKind::Folder` with the parent id.
//! - The drive root item itself is `ParentKind::Other` and never mirrored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use kbsync_core::domain::{ParentKind, Provider, RemoteId, RemoteItem};
use kbsync_core::ports::{IRemoteSource, RemotePage, SourceError};

use crate::client::ProviderClient;
use crate::{remote_id, ProviderError};

/// Microsoft Graph v1.0 base URL
pub const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// Path for the delta endpoint relative to the Graph API base URL
const DELTA_PATH: &str = "/me/drive/root/delta";

/// Parent path reported for items at the top of the drive
const DRIVE_ROOT_PATH: &str = "/drive/root:";

const SUPPORTED_PARENTS: &[ParentKind] = &[ParentKind::Folder, ParentKind::Drive];

// ============================================================================
// Microsoft Graph API response types
// ============================================================================

/// One page of `GET /me/drive/root/delta`
///
/// See: <https://learn.microsoft.com/en-us/graph/api/driveitem-delta>
#[derive(Debug, Deserialize)]
struct GraphDeltaPage {
    #[serde(default)]
    value: Vec<GraphDriveItem>,

    /// Present while more pages exist
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDriveItem {
    id: String,
    #[serde(default)]
    name: String,
    /// Absent on deleted items
    last_modified_date_time: Option<DateTime<Utc>>,
    parent_reference: Option<GraphParentReference>,
    file: Option<GraphFileFacet>,
    folder: Option<serde_json::Value>,
    deleted: Option<serde_json::Value>,
    root: Option<serde_json::Value>,
    web_url: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphParentReference {
    id: Option<String>,
    /// Format: `/drive/root:/path/to/parent`
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphFileFacet {
    mime_type: Option<String>,
}

impl GraphDriveItem {
    /// Converts to a `RemoteItem`, `None` when the item has no timestamp
    fn into_remote_item(self) -> Result<Option<RemoteItem>, ProviderError> {
        let Some(last_modified) = self.last_modified_date_time else {
            debug!(id = %self.id, "Skipping drive item without lastModifiedDateTime");
            return Ok(None);
        };

        let (parent_kind, parent_id) = if self.root.is_some() {
            (ParentKind::Other, None)
        } else {
            match self.parent_reference {
                Some(GraphParentReference {
                    path: Some(ref path),
                    ..
                }) if path == DRIVE_ROOT_PATH => (ParentKind::Drive, None),
                Some(GraphParentReference { id: Some(id), .. }) => {
                    (ParentKind::Folder, Some(remote_id(id)?))
                }
                _ => (ParentKind::Other, None),
            }
        };

        let mime_type = match (&self.file, &self.folder) {
            (Some(file), _) => file.mime_type.clone().unwrap_or_default(),
            (None, Some(_)) => "folder".to_string(),
            (None, None) => String::new(),
        };

        let mut item = RemoteItem::new(remote_id(self.id)?, parent_kind, last_modified)
            .with_name(self.name)
            .with_mime_type(mime_type)
            .with_content_ref(self.web_url.unwrap_or_default());
        item.parent_id = parent_id;
        item.trashed = self.deleted.is_some();
        Ok(Some(item))
    }
}

// ============================================================================
// AzureDriveSource
// ============================================================================

/// `IRemoteSource` over the Microsoft Graph drive API
pub struct AzureDriveSource {
    client: ProviderClient,
}

impl AzureDriveSource {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            client: ProviderClient::new(base_url, access_token)?,
        })
    }

    /// Follows delta pages until `@odata.nextLink` disappears
    async fn drain_delta(&self) -> Result<Vec<RemoteItem>, ProviderError> {
        let mut url = DELTA_PATH.to_string();
        let mut items = Vec::new();
        let mut pages: u32 = 0;

        loop {
            let page: GraphDeltaPage = self
                .client
                .send_json(self.client.request(Method::GET, &url))
                .await?;
            pages += 1;

            for raw in page.value {
                if let Some(item) = raw.into_remote_item()? {
                    items.push(item);
                }
            }

            match page.next_link {
                Some(next) if next != url => url = next,
                Some(_) => {
                    warn!(pages, "Delta nextLink repeats the current page, stopping");
                    break;
                }
                None => break,
            }
        }

        items.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        debug!(items = items.len(), pages, "Graph delta drained");
        Ok(items)
    }
}

#[async_trait]
impl IRemoteSource for AzureDriveSource {
    fn provider(&self) -> Provider {
        Provider::Azure
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
            .drain_delta()
            .await
            .map_err(ProviderError::into_listing_error)?;
        Ok(RemotePage::last(items))
    }

    async fn fetch_item(&self, id: &RemoteId) -> Result<RemoteItem, SourceError> {
        let path = format!("/me/drive/items/{}", id.as_str());
        let raw: GraphDriveItem = self
            .client
            .send_json(self.client.request(Method::GET, &path))
            .await
            .map_err(|e| e.into_fetch_error(id))?;

        match raw.into_remote_item() {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err(SourceError::RemoteItemGone(id.clone())),
            Err(e) => Err(SourceError::RemoteUnavailable(e.to_string())),
        }
    }
}
