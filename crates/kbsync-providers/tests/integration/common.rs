//! Shared helpers for provider integration tests

use chrono::{DateTime, TimeZone, Utc};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use kbsync_core::ports::{IRemoteSource, RemotePage};

/// Test access token every mock expects
pub const TOKEN: &str = "test-access-token";

/// Low-water mark far enough in the past to list everything
pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0).unwrap()
}

/// Mounts a catch-all that answers every request with `status`
pub async fn mount_status(server: &MockServer, http_method: &str, status: u16) {
    Mock::given(method(http_method))
        .respond_with(ResponseTemplate::new(status).set_body_string("mock error"))
        .mount(server)
        .await;
}

/// Follows `next_cursor` until the source reports no more pages
pub async fn list_all(source: &dyn IRemoteSource) -> Vec<RemotePage> {
    let mut pages = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = source
            .list_changed_since(cursor.as_deref(), epoch())
            .await
            .expect("listing failed");
        let more = page.has_more;
        cursor = page.next_cursor.clone();
        pages.push(page);
        if !more {
            return pages;
        }
    }
}
