//! Registry wiring against a mocked endpoint

use kbsync_core::domain::Provider;
use kbsync_providers::ProviderRegistry;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{self, TOKEN};

#[tokio::test]
async fn test_overridden_base_url_is_used() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user/repos"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let registry = ProviderRegistry::new().with_base_url(Provider::GitHub, server.uri());
    let source = registry.source_for(Provider::GitHub, TOKEN).unwrap();
    let page = source
        .list_changed_since(None, common::epoch())
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert!(!page.has_more);
}
