//! Dropbox adapter against a mocked API

use kbsync_core::domain::{ParentKind, RemoteId};
use kbsync_core::ports::{IRemoteSource, SourceError};
use kbsync_providers::dropbox::DropboxSource;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, TOKEN};

fn file(id: &str, path_display: &str, modified: &str) -> serde_json::Value {
    json!({
        ".tag": "file",
        "id": id,
        "name": path_display.rsplit('/').next().unwrap(),
        "path_lower": path_display.to_lowercase(),
        "path_display": path_display,
        "server_modified": modified
    })
}

#[tokio::test]
async fn test_listing_drains_continue_and_sorts_descending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(body_partial_json(json!({ "path": "", "recursive": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                file("id:old", "/old.txt", "2023-01-01T00:00:00Z"),
                { ".tag": "folder", "id": "id:dir", "name": "Docs", "path_lower": "/docs" }
            ],
            "cursor": "c-1",
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/continue"))
        .and(body_partial_json(json!({ "cursor": "c-1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                file("id:new", "/Docs/new.md", "2024-06-01T00:00:00Z"),
                { ".tag": "deleted", "name": "gone.txt", "path_lower": "/gone.txt" }
            ],
            "cursor": "c-2",
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = DropboxSource::new(&server.uri(), TOKEN).unwrap();
    let page = source.list_changed_since(None, common::epoch()).await.unwrap();

    assert!(!page.has_more);
    let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["id:new", "id:old"]);
    assert_eq!(page.items[0].parent_kind, ParentKind::Folder);
    assert_eq!(page.items[0].mime_type, "md");
    assert_eq!(page.items[1].parent_kind, ParentKind::Drive);
}

#[tokio::test]
async fn test_fetch_not_found_conflict_is_gone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": "path/not_found/..",
            "error": { ".tag": "path", "path": { ".tag": "not_found" } }
        })))
        .mount(&server)
        .await;

    let source = DropboxSource::new(&server.uri(), TOKEN).unwrap();
    let id = RemoteId::new("id:missing").unwrap();

    assert_eq!(
        source.fetch_item(&id).await.unwrap_err(),
        SourceError::RemoteItemGone(id)
    );
}

#[tokio::test]
async fn test_fetch_other_conflict_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "error_summary": "path/restricted_content/.."
        })))
        .mount(&server)
        .await;

    let source = DropboxSource::new(&server.uri(), TOKEN).unwrap();
    let err = source
        .fetch_item(&RemoteId::new("id:x").unwrap())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_fetch_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/2/files/get_metadata"))
        .and(body_partial_json(json!({ "path": "id:abc" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(file(
            "id:abc",
            "/Notes.txt",
            "2024-02-02T00:00:00Z",
        )))
        .mount(&server)
        .await;

    let source = DropboxSource::new(&server.uri(), TOKEN).unwrap();
    let item = source
        .fetch_item(&RemoteId::new("id:abc").unwrap())
        .await
        .unwrap();

    assert_eq!(item.name, "Notes.txt");
    assert!(source.classify_supported(&item));
}
