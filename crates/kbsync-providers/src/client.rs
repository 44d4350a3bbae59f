//! Authenticated HTTP client shared by the provider adapters
//!
//! Wraps `reqwest::Client` with bearer authentication, base URL construction,
//! per-provider default headers and HTTP status classification into
//! [`ProviderError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use kbsync_providers::client::ProviderClient;
//! use reqwest::Method;
//!
//! # async fn example() -> Result<(), kbsync_providers::ProviderError> {
//! let client = ProviderClient::new("https://api.github.com", "access-token")?;
//! let repos: serde_json::Value = client
//!     .send_json(client.request(Method::GET, "/user/repos"))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::ProviderError;

/// Per-request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default retry-after duration when the header is missing
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Maximum length of an error body kept in error messages
const MAX_ERROR_BODY: usize = 512;

const USER_AGENT: &str = concat!("kbsync/", env!("CARGO_PKG_VERSION"));

/// HTTP client for one provider connection
pub struct ProviderClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests, without trailing slash
    base_url: String,
    /// OAuth2 access token
    access_token: String,
}

impl ProviderClient {
    /// Creates a new client for `base_url` authenticated with `access_token`
    ///
    /// # Errors
    /// Returns `ProviderError::NetworkError` if the HTTP client cannot be built.
    pub fn new(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, ProviderError> {
        Self::with_headers(base_url, access_token, HeaderMap::new())
    }

    /// Creates a new client sending `headers` on every request
    ///
    /// # Errors
    /// Returns `ProviderError::NetworkError` if the HTTP client cannot be built.
    pub fn with_headers(
        base_url: impl Into<String>,
        access_token: impl Into<String>,
        headers: HeaderMap,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Relative paths are appended to the base URL; absolute URLs (pagination
    /// links returned by the provider) are used as-is.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        };
        self.client
            .request(method, &url)
            .bearer_auth(&self.access_token)
    }

    /// Sends a request and classifies non-success statuses
    ///
    /// # Errors
    /// Returns the [`ProviderError`] matching the response status, or
    /// `NetworkError` if the request could not be sent.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
            .unwrap_or(DEFAULT_RETRY_AFTER);
        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();

        debug!(status = status.as_u16(), path = %url, "Provider returned error status");
        Err(classify_status(status, retry_after, truncate(&body)))
    }

    /// Sends a request and deserializes the JSON body
    ///
    /// # Errors
    /// As [`ProviderClient::send`], plus `InvalidResponse` if the body does
    /// not match `T`.
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ProviderError> {
        let response = self.send(request).await?;
        parse_json(response).await
    }
}

/// Deserializes a successful response body
pub(crate) async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes)
        .map_err(|e| ProviderError::InvalidResponse(format!("Failed to parse response JSON: {e}")))
}

/// Builds a header map from static name/value pairs
pub(crate) fn static_headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in pairs {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

/// Maps an HTTP error status to a [`ProviderError`]
pub fn classify_status(status: StatusCode, retry_after: Duration, body: String) -> ProviderError {
    match status {
        StatusCode::UNAUTHORIZED => ProviderError::Unauthorized(body),
        StatusCode::FORBIDDEN => ProviderError::Forbidden(body),
        StatusCode::NOT_FOUND => ProviderError::NotFound(body),
        StatusCode::GONE => ProviderError::Gone(body),
        StatusCode::CONFLICT => ProviderError::Conflict(body),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::TooManyRequests { retry_after },
        s if s.is_server_error() => ProviderError::ServerError(format!("{}: {}", s.as_u16(), body)),
        s => ProviderError::UnexpectedStatus {
            status: s.as_u16(),
            body,
        },
    }
}

/// Parses a `Retry-After` header value
///
/// Accepts integer seconds or an HTTP date; falls back to `default`.
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds);
    }

    if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value.trim()) {
        let diff = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
        if let Ok(secs) = u64::try_from(diff.num_seconds()) {
            if secs <= 3600 {
                return Duration::from_secs(secs);
            }
        }
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
