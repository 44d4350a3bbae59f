//! GitHub adapter against a mocked API

use kbsync_core::domain::{ParentKind, RemoteId};
use kbsync_core::ports::{IRemoteSource, SourceError};
use kbsync_providers::github::GitHubSource;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, TOKEN};

fn repo(id: u64, name: &str, updated: &str) -> serde_json::Value {
    json!({
        "id": id,
        "full_name": name,
        "html_url": format!("https://github.com/{name}"),
        "updated_at": updated,
        "archived": false
    })
}

#[tokio::test]
async fn test_link_header_drives_pagination() {
    let server = MockServer::start().await;
    let next = format!("<{}/user/repos?page=2>; rel=\"next\"", server.uri());

    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("page", "1"))
        .and(query_param("sort", "updated"))
        .and(header("x-github-api-version", "2022-11-28"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("link", next.as_str())
                .set_body_json(json!([repo(2, "octo/new", "2024-05-01T00:00:00Z")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .and(query_param("page", "2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([repo(1, "octo/old", "2023-05-01T00:00:00Z")])),
        )
        .mount(&server)
        .await;

    let source = GitHubSource::new(&server.uri(), TOKEN).unwrap();
    let pages = common::list_all(&source).await;

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].next_cursor.as_deref(), Some("2"));
    assert_eq!(pages[1].items[0].id.as_str(), "1");
    assert_eq!(pages[1].items[0].parent_kind, ParentKind::Workspace);
}

#[tokio::test]
async fn test_invalid_cursor_is_unavailable() {
    let server = MockServer::start().await;
    let source = GitHubSource::new(&server.uri(), TOKEN).unwrap();

    let err = source
        .list_changed_since(Some("not-a-page"), common::epoch())
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::RemoteUnavailable(_)));
}

#[tokio::test]
async fn test_fetch_repository_and_gone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/repositories/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(repo(7, "octo/seven", "2024-01-01T00:00:00Z")),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/repositories/8"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = GitHubSource::new(&server.uri(), TOKEN).unwrap();

    let item = source.fetch_item(&RemoteId::new("7").unwrap()).await.unwrap();
    assert_eq!(item.name, "octo/seven");

    let gone = RemoteId::new("8").unwrap();
    assert_eq!(
        source.fetch_item(&gone).await.unwrap_err(),
        SourceError::RemoteItemGone(gone)
    );
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let server = MockServer::start().await;
    common::mount_status(&server, "GET", 502).await;

    let source = GitHubSource::new(&server.uri(), TOKEN).unwrap();
    let err = source
        .fetch_item(&RemoteId::new("7").unwrap())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}
