//! Google Drive adapter against a mocked API

use kbsync_core::domain::{ParentKind, RemoteId};
use kbsync_core::ports::{IRemoteSource, SourceError};
use kbsync_providers::google::GoogleDriveSource;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, TOKEN};

async fn mount_root(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "root-abc" })))
        .expect(1)
        .mount(server)
        .await;
}

fn file(id: &str, parent: &str, modified: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": format!("{id}.pdf"),
        "mimeType": "application/pdf",
        "modifiedTime": modified,
        "parents": [parent],
        "trashed": false,
        "webViewLink": format!("https://drive.google.com/file/d/{id}/view")
    })
}

#[tokio::test]
async fn test_list_resolves_root_once_and_paginates() {
    let server = MockServer::start().await;
    mount_root(&server).await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("pageToken", "tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [file("f-3", "folder-1", "2024-01-01T00:00:00Z")]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param("orderBy", "modifiedTime desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "nextPageToken": "tok-2",
            "files": [
                file("folder-1", "root-abc", "2024-03-01T00:00:00Z"),
                file("f-2", "root-abc", "2024-02-01T00:00:00Z")
            ]
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let source = GoogleDriveSource::new(&server.uri(), TOKEN).unwrap();
    let pages = common::list_all(&source).await;

    assert_eq!(pages.len(), 2);
    assert_eq!(pages[0].items[0].parent_kind, ParentKind::Drive);
    assert!(pages[0].items[0].parent_id.is_none());
    let nested = &pages[1].items[0];
    assert_eq!(nested.parent_kind, ParentKind::Folder);
    assert_eq!(nested.parent_id.as_ref().unwrap().as_str(), "folder-1");
}

#[tokio::test]
async fn test_fetch_trashed_file_is_not_supported() {
    let server = MockServer::start().await;
    mount_root(&server).await;

    let mut body = file("f-1", "root-abc", "2024-01-01T00:00:00Z");
    body["trashed"] = json!(true);
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/f-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let source = GoogleDriveSource::new(&server.uri(), TOKEN).unwrap();
    let item = source.fetch_item(&RemoteId::new("f-1").unwrap()).await.unwrap();

    assert!(item.trashed);
    assert!(!source.classify_supported(&item));
}

#[tokio::test]
async fn test_fetch_missing_file_is_gone() {
    let server = MockServer::start().await;
    mount_root(&server).await;
    Mock::given(method("GET"))
        .and(path("/drive/v3/files/f-404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = GoogleDriveSource::new(&server.uri(), TOKEN).unwrap();
    let id = RemoteId::new("f-404").unwrap();

    assert_eq!(
        source.fetch_item(&id).await.unwrap_err(),
        SourceError::RemoteItemGone(id)
    );
}

#[tokio::test]
async fn test_unauthorized_listing_is_unavailable() {
    let server = MockServer::start().await;
    common::mount_status(&server, "GET", 401).await;

    let source = GoogleDriveSource::new(&server.uri(), TOKEN).unwrap();
    let err = source
        .list_changed_since(None, common::epoch())
        .await
        .unwrap_err();

    assert!(matches!(err, SourceError::RemoteUnavailable(_)));
}
