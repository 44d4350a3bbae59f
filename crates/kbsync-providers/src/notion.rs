//! Notion remote source
//!
//! Lists pages through `POST /v1/search` sorted by `last_edited_time`
//! descending and re-fetches single pages through `GET /v1/pages/{id}`.
//!
//! Pages are mirrored as markdown (`md`). A page is a first-class item when
//! its parent is another page or the workspace; pages inside databases or
//! blocks are listed but not supported.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use kbsync_core::domain::{ParentKind, Provider, RemoteId, RemoteItem};
use kbsync_core::ports::{IRemoteSource, RemotePage, SourceError};

use crate::client::{static_headers, ProviderClient};
use crate::{remote_id, ProviderError};

/// Public Notion API base URL
pub const NOTION_BASE_URL: &str = "https://api.notion.com";

/// Notion API version pinned for request and response shapes
const NOTION_VERSION: &str = "2022-06-28";

const PAGE_SIZE: u32 = 100;

const SUPPORTED_PARENTS: &[ParentKind] = &[ParentKind::Page, ParentKind::Workspace];

// ============================================================================
// Notion API response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<NotionPage>,
    next_cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct NotionPage {
    id: String,
    last_edited_time: DateTime<Utc>,
    #[serde(default)]
    archived: bool,
    /// Absent on older API versions
    in_trash: Option<bool>,
    parent: NotionParent,
    #[serde(default)]
    url: String,
    #[serde(default)]
    properties: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct NotionParent {
    #[serde(rename = "type")]
    kind: String,
    page_id: Option<String>,
    database_id: Option<String>,
    block_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RichText {
    #[serde(default)]
    plain_text: String,
}

impl NotionPage {
    /// Concatenated plain text of the page's title property
    fn title(&self) -> String {
        let title = self
            .properties
            .values()
            .find(|p| p.get("type").and_then(|t| t.as_str()) == Some("title"))
            .and_then(|p| p.get("title"))
            .and_then(|t| serde_json::from_value::<Vec<RichText>>(t.clone()).ok())
            .map(|parts| parts.into_iter().map(|p| p.plain_text).collect::<String>())
            .unwrap_or_default();

        if title.trim().is_empty() {
            "Untitled".to_string()
        } else {
            title
        }
    }

    fn into_remote_item(self) -> Result<RemoteItem, ProviderError> {
        let (parent_kind, parent_id) = match self.parent.kind.as_str() {
            "page_id" => (ParentKind::Page, self.parent.page_id.clone()),
            "workspace" => (ParentKind::Workspace, None),
            "database_id" => (ParentKind::Other, self.parent.database_id.clone()),
            "block_id" => (ParentKind::Other, self.parent.block_id.clone()),
            _ => (ParentKind::Other, None),
        };

        let name = self.title();
        let mut item = RemoteItem::new(remote_id(self.id)?, parent_kind, self.last_edited_time)
            .with_name(name)
            .with_mime_type("md")
            .with_content_ref(self.url);
        item.parent_id = parent_id.map(remote_id).transpose()?;
        item.archived = self.archived;
        item.trashed = self.in_trash.unwrap_or(false);
        Ok(item)
    }
}

// ============================================================================
// NotionSource
// ============================================================================

/// `IRemoteSource` over the Notion API
pub struct NotionSource {
    client: ProviderClient,
}

impl NotionSource {
    /// Creates a source talking to `base_url` with an integration token
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, ProviderError> {
        let headers = static_headers(&[("notion-version", NOTION_VERSION)]);
        Ok(Self {
            client: ProviderClient::with_headers(base_url, access_token, headers)?,
        })
    }

    async fn search(&self, cursor: Option<&str>) -> Result<SearchResponse, ProviderError> {
        let mut body = json!({
            "filter": { "property": "object", "value": "page" },
            "sort": { "direction": "descending", "timestamp": "last_edited_time" },
            "page_size": PAGE_SIZE,
        });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }

        self.client
            .send_json(self.client.request(Method::POST, "/v1/search").json(&body))
            .await
    }
}

#[async_trait]
impl IRemoteSource for NotionSource {
    fn provider(&self) -> Provider {
        Provider::Notion
    }

    fn supported_parent_kinds(&self) -> &'static [ParentKind] {
        SUPPORTED_PARENTS
    }

    async fn list_changed_since(
        &self,
        cursor: Option<&str>,
        _low_water_mark: DateTime<Utc>,
    ) -> Result<RemotePage, SourceError> {
        let response = self
            .search(cursor)
            .await
            .map_err(ProviderError::into_listing_error)?;

        debug!(
            results = response.results.len(),
            has_more = response.has_more,
            "Notion search page"
        );

        let items = response
            .results
            .into_iter()
            .map(NotionPage::into_remote_item)
            .collect::<Result<Vec<_>, _>>()
            .map_err(ProviderError::into_listing_error)?;

        Ok(RemotePage {
            items,
            next_cursor: response.next_cursor,
            has_more: response.has_more,
        })
    }

    async fn fetch_item(&self, id: &RemoteId) -> Result<RemoteItem, SourceError> {
        let path = format!("/v1/pages/{}", id.as_str());
        let page: NotionPage = self
            .client
            .send_json(self.client.request(Method::GET, &path))
            .await
            .map_err(|e| e.into_fetch_error(id))?;

        page.into_remote_item()
            .map_err(|e| SourceError::RemoteUnavailable(e.to_string()))
    }
}
