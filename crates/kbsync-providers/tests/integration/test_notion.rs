//! Notion adapter against a mocked API

use kbsync_core::domain::{ParentKind, RemoteId};
use kbsync_core::ports::{IRemoteSource, SourceError};
use kbsync_providers::notion::NotionSource;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, TOKEN};

fn page(id: &str, edited: &str, parent: serde_json::Value) -> serde_json::Value {
    json!({
        "object": "page",
        "id": id,
        "last_edited_time": edited,
        "archived": false,
        "in_trash": false,
        "parent": parent,
        "url": format!("https://www.notion.so/{id}"),
        "properties": {
            "Name": { "id": "title", "type": "title", "title": [{ "plain_text": id }] }
        }
    })
}

#[tokio::test]
async fn test_search_sends_version_and_sort() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/search"))
        .and(header("notion-version", "2022-06-28"))
        .and(header("authorization", "Bearer test-access-token"))
        .and(body_partial_json(json!({
            "filter": { "property": "object", "value": "page" },
            "sort": { "direction": "descending", "timestamp": "last_edited_time" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "results": [
                page("p-2", "2024-03-02T00:00:00.000Z", json!({"type": "workspace", "workspace": true})),
                page("p-1", "2024-03-01T00:00:00.000Z", json!({"type": "page_id", "page_id": "p-2"}))
            ],
            "next_cursor": null,
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = NotionSource::new(&server.uri(), TOKEN).unwrap();
    let result = source.list_changed_since(None, common::epoch()).await.unwrap();

    assert!(!result.has_more);
    assert_eq!(result.items.len(), 2);
    assert_eq!(result.items[0].parent_kind, ParentKind::Workspace);
    assert_eq!(result.items[1].parent_id.as_ref().unwrap().as_str(), "p-2");
}

#[tokio::test]
async fn test_search_pagination_passes_start_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/search"))
        .and(body_partial_json(json!({ "start_cursor": "cursor-2" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [page("p-old", "2024-01-01T00:00:00.000Z", json!({"type": "workspace", "workspace": true}))],
            "next_cursor": null,
            "has_more": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [page("p-new", "2024-03-01T00:00:00.000Z", json!({"type": "workspace", "workspace": true}))],
            "next_cursor": "cursor-2",
            "has_more": true
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let source = NotionSource::new(&server.uri(), TOKEN).unwrap();
    let pages = common::list_all(&source).await;

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].next_cursor.as_deref(), Some("cursor-2"));
    assert_eq!(pages[1].items[0].id.as_str(), "p-old");
}

#[tokio::test]
async fn test_fetch_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/pages/p-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(
            "p-1",
            "2024-03-01T00:00:00.000Z",
            json!({"type": "database_id", "database_id": "db-1"}),
        )))
        .mount(&server)
        .await;

    let source = NotionSource::new(&server.uri(), TOKEN).unwrap();
    let item = source.fetch_item(&RemoteId::new("p-1").unwrap()).await.unwrap();

    assert_eq!(item.parent_kind, ParentKind::Other);
    assert!(!source.classify_supported(&item));
}

#[tokio::test]
async fn test_fetch_missing_page_is_gone() {
    let server = MockServer::start().await;
    common::mount_status(&server, "GET", 404).await;

    let source = NotionSource::new(&server.uri(), TOKEN).unwrap();
    let id = RemoteId::new("p-404").unwrap();
    let err = source.fetch_item(&id).await.unwrap_err();

    assert_eq!(err, SourceError::RemoteItemGone(id));
}

#[tokio::test]
async fn test_rate_limited_search_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "5"))
        .mount(&server)
        .await;

    let source = NotionSource::new(&server.uri(), TOKEN).unwrap();
    let err = source
        .list_changed_since(None, common::epoch())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}
