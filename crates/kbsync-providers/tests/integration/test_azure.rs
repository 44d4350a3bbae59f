//! Microsoft Graph adapter against a mocked API

use kbsync_core::domain::{ParentKind, RemoteId};
use kbsync_core::ports::{IRemoteSource, SourceError};
use kbsync_providers::azure::AzureDriveSource;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, TOKEN};

#[tokio::test]
async fn test_delta_follows_next_link_and_sorts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/me/drive/root/delta"))
        .and(query_param("$skiptoken", "page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "file-new",
                "name": "new.txt",
                "lastModifiedDateTime": "2026-01-20T10:00:00Z",
                "parentReference": { "id": "folder-1", "path": "/drive/root:/Documents" },
                "file": { "mimeType": "text/plain" }
            }],
            "@odata.deltaLink": format!("{}/me/drive/root/delta?token=t1", server.uri())
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/drive/root/delta"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {
                    "id": "root",
                    "name": "root",
                    "lastModifiedDateTime": "2026-01-01T00:00:00Z",
                    "root": {},
                    "folder": { "childCount": 1 }
                },
                {
                    "id": "folder-1",
                    "name": "Documents",
                    "lastModifiedDateTime": "2026-01-10T00:00:00Z",
                    "parentReference": { "id": "root", "path": "/drive/root:" },
                    "folder": { "childCount": 1 }
                }
            ],
            "@odata.nextLink": format!("{}/me/drive/root/delta?$skiptoken=page2", server.uri())
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let source = AzureDriveSource::new(&server.uri(), TOKEN).unwrap();
    let page = source.list_changed_since(None, common::epoch()).await.unwrap();

    assert!(!page.has_more);
    let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["file-new", "folder-1", "root"]);

    assert_eq!(page.items[0].parent_kind, ParentKind::Folder);
    assert_eq!(page.items[1].parent_kind, ParentKind::Drive);
    assert!(!source.classify_supported(&page.items[2]));
}

#[tokio::test]
async fn test_fetch_item_and_gone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/me/drive/items/file-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "file-1",
            "name": "a.txt",
            "lastModifiedDateTime": "2026-01-20T10:00:00Z",
            "parentReference": { "id": "root", "path": "/drive/root:" },
            "file": { "mimeType": "text/plain" },
            "webUrl": "https://onedrive.live.com/a.txt"
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/me/drive/items/file-2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let source = AzureDriveSource::new(&server.uri(), TOKEN).unwrap();

    let item = source.fetch_item(&RemoteId::new("file-1").unwrap()).await.unwrap();
    assert_eq!(item.content_ref, "https://onedrive.live.com/a.txt");
    assert!(source.classify_supported(&item));

    let gone = RemoteId::new("file-2").unwrap();
    assert_eq!(
        source.fetch_item(&gone).await.unwrap_err(),
        SourceError::RemoteItemGone(gone)
    );
}

#[tokio::test]
async fn test_delta_failure_is_unavailable() {
    let server = MockServer::start().await;
    common::mount_status(&server, "GET", 503).await;

    let source = AzureDriveSource::new(&server.uri(), TOKEN).unwrap();
    let err = source
        .list_changed_since(None, common::epoch())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
}
