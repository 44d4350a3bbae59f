//! Google Drive remote source
//!
//! Lists files through `GET /drive/v3/files` ordered by `modifiedTime desc`
//! and re-fetches through `GET /drive/v3/files/{id}`. Folders are mirrored
//! like files so that their children can be cascade-checked.
//!
//! Items directly under "My Drive" get `ParentKind::Drive` and no parent id;
//! the root folder id is resolved once per source.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

use kbsync_core::domain::{ParentKind, Provider, RemoteId, RemoteItem};
use kbsync_core::ports::{IRemoteSource, RemotePage, SourceError};

use crate::client::ProviderClient;
use crate::{remote_id, ProviderError};

/// Public Google APIs base URL
pub const GOOGLE_BASE_URL: &str = "https://www.googleapis.com";

const FILE_FIELDS: &str = "id,name,mimeType,modifiedTime,parents,trashed,webViewLink";

const PAGE_SIZE: &str = "100";

const SUPPORTED_PARENTS: &[ParentKind] = &[ParentKind::Folder, ParentKind::Drive];

// ============================================================================
// Drive API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    mime_type: String,
    modified_time: DateTime<Utc>,
    #[serde(default)]
    parents: Vec<String>,
    #[serde(default)]
    trashed: bool,
    web_view_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RootFolder {
    id: String,
}

impl DriveFile {
    fn into_remote_item(self, root_id: &str) -> Result<RemoteItem, ProviderError> {
        let (parent_kind, parent_id) = match self.parents.first() {
            Some(parent) if parent == root_id => (ParentKind::Drive, None),
            Some(parent) => (ParentKind::Folder, Some(remote_id(parent.as_str())?)),
            // Shared items outside the user's hierarchy
            None => (ParentKind::Other, None),
        };

        let content_ref = self
            .web_view_link
            .unwrap_or_else(|| format!("https://drive.google.com/open?id={}", self.id));

        let mut item = RemoteItem::new(remote_id(self.id)?, parent_kind, self.modified_time)
            .with_name(self.name)
            .with_mime_type(self.mime_type)
            .with_content_ref(content_ref);
        item.parent_id = parent_id;
        item.trashed = self.trashed;
        Ok(item)
    }
}

// ============================================================================
// GoogleDriveSource
// ============================================================================

/// `IRemoteSource` over the Google Drive v3 API
pub struct GoogleDriveSource {
    client: ProviderClient,
    root_id: OnceCell<String>,
}

impl GoogleDriveSource {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, ProviderError> {
        Ok(Self {
            client: ProviderClient::new(base_url, access_token)?,
            root_id: OnceCell::new(),
        })
    }

    /// Id of the user's "My Drive" root folder
    async fn root_id(&self) -> Result<&str, ProviderError> {
        let id = self
            .root_id
            .get_or_try_init(|| async {
                let root: RootFolder = self
                    .client
                    .send_json(
                        self.client
                            .request(Method::GET, "/drive/v3/files/root")
                            .query(&[("fields", "id")]),
                    )
                    .await?;
                debug!(root_id = %root.id, "Resolved Drive root folder");
                Ok::<_, ProviderError>(root.id)
            })
            .await?;
        Ok(id.as_str())
    }

    async fn list_page(&self, cursor: Option<&str>) -> Result<RemotePage, ProviderError> {
        let root_id = self.root_id().await?;

        let fields = format!("nextPageToken,files({FILE_FIELDS})");
        let mut request = self
            .client
            .request(Method::GET, "/drive/v3/files")
            .query(&[
                ("orderBy", "modifiedTime desc"),
                ("pageSize", PAGE_SIZE),
                ("fields", fields.as_str()),
            ]);
        if let Some(token) = cursor {
            request = request.query(&[("pageToken", token)]);
        }

        let list: FileList = self.client.send_json(request).await?;
        let items = list
            .files
            .into_iter()
            .map(|f| f.into_remote_item(root_id))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(items = items.len(), has_more = list.next_page_token.is_some(), "Drive files page");

        Ok(RemotePage {
            items,
            has_more: list.next_page_token.is_some(),
            next_cursor: list.next_page_token,
        })
    }
}

#[async_trait]
impl IRemoteSource for GoogleDriveSource {
    fn provider(&self) -> Provider {
        Provider::Google
    }

    fn supported_parent_kinds(&self) -> &'static [ParentKind] {
        SUPPORTED_PARENTS
    }

    async fn list_changed_since(
        &self,
        cursor: Option<&str>,
        _low_water_mark: DateTime<Utc>,
    ) -> Result<RemotePage, SourceError> {
        self.list_page(cursor)
            .await
            .map_err(ProviderError::into_listing_error)
    }

    async fn fetch_item(&self, id: &RemoteId) -> Result<RemoteItem, SourceError> {
        let root_id = self
            .root_id()
            .await
            .map_err(ProviderError::into_listing_error)?;

        let path = format!("/drive/v3/files/{}", id.as_str());
        let file: DriveFile = self
            .client
            .send_json(
                self.client
                    .request(Method::GET, &path)
                    .query(&[("fields", FILE_FIELDS)]),
            )
            .await
            .map_err(|e| e.into_fetch_error(id))?;

        file.into_remote_item(root_id)
            .map_err(|e| SourceError::RemoteUnavailable(e.to_string()))
    }
}
