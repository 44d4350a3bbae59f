//! GitHub remote source
//!
//! Mirrors the repositories the authenticated user can access. Listing uses
//! `GET /user/repos?sort=updated&direction=desc` with page-number pagination;
//! the cursor is the next page number and `has_more` follows the `Link`
//! header's `rel="next"` entry.
//!
//! Repositories hang off the account, so every item has
//! `ParentKind::Workspace` and no parent id.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::LINK;
use reqwest::Method;
use serde::Deserialize;
use tracing::debug;

use kbsync_core::domain::{ParentKind, Provider, RemoteId, RemoteItem};
use kbsync_core::ports::{IRemoteSource, RemotePage, SourceError};

use crate::client::{parse_json, static_headers, ProviderClient};
use crate::{remote_id, ProviderError};

/// Public GitHub REST API base URL
pub const GITHUB_BASE_URL: &str = "https://api.github.com";

const API_VERSION: &str = "2022-11-28";

const PER_PAGE: &str = "100";

const SUPPORTED_PARENTS: &[ParentKind] = &[ParentKind::Workspace];

#[derive(Debug, Deserialize)]
struct Repository {
    id: u64,
    full_name: String,
    html_url: String,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    archived: bool,
}

impl Repository {
    fn into_remote_item(self) -> Result<RemoteItem, ProviderError> {
        let mut item = RemoteItem::new(
            remote_id(self.id.to_string())?,
            ParentKind::Workspace,
            self.updated_at,
        )
        .with_name(self.full_name)
        .with_mime_type("repository")
        .with_content_ref(self.html_url);
        item.archived = self.archived;
        Ok(item)
    }
}

/// Returns true if a `Link` header advertises a next page
fn has_next_link(link: &str) -> bool {
    link.split(',')
        .any(|part| part.split(';').skip(1).any(|p| p.trim() == "rel=\"next\""))
}

/// `IRemoteSource` over the GitHub REST API
pub struct GitHubSource {
    client: ProviderClient,
}

impl GitHubSource {
    pub fn new(base_url: &str, access_token: &str) -> Result<Self, ProviderError> {
        let headers = static_headers(&[
            ("accept", "application/vnd.github+json"),
            ("x-github-api-version", API_VERSION),
        ]);
        Ok(Self {
            client: ProviderClient::with_headers(base_url, access_token, headers)?,
        })
    }

    async fn list_page(&self, page: u32) -> Result<RemotePage, ProviderError> {
        let page_param = page.to_string();
        let request = self.client.request(Method::GET, "/user/repos").query(&[
            ("sort", "updated"),
            ("direction", "desc"),
            ("per_page", PER_PAGE),
            ("page", page_param.as_str()),
        ]);

        let response = self.client.send(request).await?;
        let has_more = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .is_some_and(has_next_link);

        let repos: Vec<Repository> = parse_json(response).await?;
        let items = repos
            .into_iter()
            .map(Repository::into_remote_item)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(page, items = items.len(), has_more, "GitHub repositories page");

        Ok(if has_more {
            RemotePage::with_next(items, (page + 1).to_string())
        } else {
            RemotePage::last(items)
        })
    }
}

#[async_trait]
impl IRemoteSource for GitHubSource {
    fn provider(&self) -> Provider {
        Provider::GitHub
    }

    fn supported_parent_kinds(&self) -> &'static [ParentKind] {
        SUPPORTED_PARENTS
    }

    async fn list_changed_since(
        &self,
        cursor: Option<&str>,
        _low_water_mark: DateTime<Utc>,
    ) -> Result<RemotePage, SourceError> {
        let page = match cursor {
            None => 1,
            Some(c) => c.parse::<u32>().map_err(|_| {
                SourceError::RemoteUnavailable(format!("invalid GitHub page cursor: {c}"))
            })?,
        };
        self.list_page(page)
            .await
            .map_err(ProviderError::into_listing_error)
    }

    async fn fetch_item(&self, id: &RemoteId) -> Result<RemoteItem, SourceError> {
        let path = format!("/repositories/{}", id.as_str());
        let repo: Repository = self
            .client
            .send_json(self.client.request(Method::GET, &path))
            .await
            .map_err(|e| e.into_fetch_error(id))?;

        repo.into_remote_item()
            .map_err(|e| SourceError::RemoteUnavailable(e.to_string()))
    }
}
