//! Provider registry
//!
//! Maps a [`Provider`] and an access token to a ready `IRemoteSource`,
//! applying per-provider base URL overrides from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use kbsync_core::config::{Config, ConnectionConfig};
use kbsync_core::domain::Provider;
use kbsync_core::ports::IRemoteSource;

use crate::azure::{AzureDriveSource, GRAPH_BASE_URL};
use crate::dropbox::{DropboxSource, DROPBOX_BASE_URL};
use crate::github::{GitHubSource, GITHUB_BASE_URL};
use crate::google::{GoogleDriveSource, GOOGLE_BASE_URL};
use crate::notion::{NotionSource, NOTION_BASE_URL};
use crate::ProviderError;

/// Builds remote sources by provider
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    endpoints: HashMap<Provider, String>,
}

impl ProviderRegistry {
    /// Creates a registry pointing every provider at its public endpoint
    pub fn new() -> Self {
        let endpoints = Provider::ALL
            .iter()
            .map(|p| (*p, default_base_url(*p).to_string()))
            .collect();
        Self { endpoints }
    }

    /// Creates a registry honoring `providers.<name>.base_url` overrides
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::new();
        for provider in Provider::ALL {
            if let Some(url) = config.base_url(provider) {
                registry = registry.with_base_url(provider, url);
            }
        }
        registry
    }

    /// Overrides the API base URL of one provider
    pub fn with_base_url(mut self, provider: Provider, base_url: impl Into<String>) -> Self {
        self.endpoints.insert(provider, base_url.into());
        self
    }

    /// Returns the API base URL used for `provider`
    pub fn base_url(&self, provider: Provider) -> &str {
        self.endpoints
            .get(&provider)
            .map(String::as_str)
            .unwrap_or_else(|| default_base_url(provider))
    }

    /// Builds a source for `provider` authenticated with `access_token`
    ///
    /// # Errors
    /// Returns `ProviderError::NetworkError` if the HTTP client cannot be built.
    pub fn source_for(
        &self,
        provider: Provider,
        access_token: &str,
    ) -> Result<Arc<dyn IRemoteSource>, ProviderError> {
        let base_url = self.base_url(provider);
        debug!(%provider, base_url, "Building remote source");

        let source: Arc<dyn IRemoteSource> = match provider {
            Provider::Notion => Arc::new(NotionSource::new(base_url, access_token)?),
            Provider::Google => Arc::new(GoogleDriveSource::new(base_url, access_token)?),
            Provider::Dropbox => Arc::new(DropboxSource::new(base_url, access_token)?),
            Provider::GitHub => Arc::new(GitHubSource::new(base_url, access_token)?),
            Provider::Azure => Arc::new(AzureDriveSource::new(base_url, access_token)?),
        };
        Ok(source)
    }

    /// Resolves the connection's token and builds its source
    pub fn connect(&self, connection: &ConnectionConfig) -> anyhow::Result<Arc<dyn IRemoteSource>> {
        let token = connection.resolve_token()?;
        self.source_for(connection.provider, &token).with_context(|| {
            format!(
                "Failed to build {} source for user {}",
                connection.provider, connection.user_id
            )
        })
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn default_base_url(provider: Provider) -> &'static str {
    match provider {
        Provider::Notion => NOTION_BASE_URL,
        Provider::Google => GOOGLE_BASE_URL,
        Provider::Dropbox => DROPBOX_BASE_URL,
        Provider::GitHub => GITHUB_BASE_URL,
        Provider::Azure => GRAPH_BASE_URL,
    }
}
