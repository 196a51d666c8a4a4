//! JSON metadata endpoint E2E tests

mod helper;

use mockito::{Matcher, Server};

use helper::{SITE_HOST, create_engine, metadata_body};
use update_resolver::component::ComponentConfig;
use update_resolver::engine::{NoDecision, Resolution, UpdateDecision};
use update_resolver::fetch::error::FetchError;

#[tokio::test]
async fn offers_update_when_remote_is_newer() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/my-plugin.json")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(metadata_body("1.2.0", "https://updates.example.com/my-plugin-1.2.0.zip"))
        .expect(1)
        .create_async()
        .await;

    let engine = create_engine(&server.url());
    let component = ComponentConfig::new(
        "my-plugin",
        "1.0.0",
        &format!("{}/my-plugin.json", server.url()),
    );

    let resolution = engine.resolve(&component).await;

    mock.assert_async().await;
    let Some(UpdateDecision::UpdateAvailable(offer)) = resolution.decision() else {
        panic!("expected an update, got {resolution:?}");
    };
    assert_eq!(offer.new_version, "1.2.0");
    assert_eq!(offer.package, "https://updates.example.com/my-plugin-1.2.0.zip");
    assert_eq!(offer.requires_php, "7.4");
    assert_eq!(offer.sections.get("changelog").map(String::as_str), Some("<ul><li>Fixes</li></ul>"));
}

#[tokio::test]
async fn dynamic_server_receives_slug_key_and_domain() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/updates")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("action".into(), "get_metadata".into()),
            Matcher::UrlEncoded("slug".into(), "my-plugin".into()),
            Matcher::UrlEncoded("key".into(), "lic-123".into()),
            Matcher::UrlEncoded("domain".into(), SITE_HOST.into()),
        ]))
        .with_status(200)
        .with_body(metadata_body("1.0.0", ""))
        .expect(1)
        .create_async()
        .await;

    let engine = create_engine(&server.url());
    let mut component =
        ComponentConfig::new("my-plugin", "1.0.0", &format!("{}/updates/", server.url()));
    component.key = Some("lic-123".to_string());

    let resolution = engine.resolve(&component).await;

    mock.assert_async().await;
    assert!(matches!(
        resolution.decision(),
        Some(UpdateDecision::UpToDate(_))
    ));
}

#[tokio::test]
async fn failed_fetch_is_cached_and_not_retried() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/index.json")
        .with_status(503)
        .expect(1)
        .create_async()
        .await;

    let engine = create_engine(&server.url());
    let component =
        ComponentConfig::new("my-plugin", "1.0.0", &format!("{}/index.json", server.url()));

    let first = engine.resolve(&component).await;
    let second = engine.resolve(&component).await;

    mock.assert_async().await;
    assert!(matches!(
        first,
        Resolution::NoDecision(NoDecision::FetchFailed(FetchError::UnexpectedStatus {
            status: 503
        }))
    ));
    assert!(matches!(
        second,
        Resolution::NoDecision(NoDecision::CachedFailure)
    ));
}

#[tokio::test]
async fn undecodable_body_is_a_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/index.json")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    let engine = create_engine(&server.url());
    let component =
        ComponentConfig::new("my-plugin", "1.0.0", &format!("{}/index.json", server.url()));

    let resolution = engine.resolve(&component).await;

    let Resolution::NoDecision(NoDecision::FetchFailed(err)) = resolution else {
        panic!("expected a fetch failure");
    };
    assert!(matches!(err, FetchError::InvalidPayload(_)));
    assert_eq!(err.code(), Some(200));
}

#[tokio::test]
async fn invalidation_forces_refetch() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/index.json")
        .with_status(200)
        .with_body(metadata_body("1.2.0", "https://updates.example.com/p.zip"))
        .expect(2)
        .create_async()
        .await;

    let engine = create_engine(&server.url());
    let component =
        ComponentConfig::new("my-plugin", "1.0.0", &format!("{}/index.json", server.url()));

    assert!(engine.resolve(&component).await.is_update_available());
    assert!(engine.resolve(&component).await.is_update_available());
    engine.invalidate(&component).unwrap();
    assert!(engine.resolve(&component).await.is_update_available());

    mock.assert_async().await;
}

#[tokio::test]
async fn details_come_from_cache_only() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/index.json")
        .with_status(200)
        .with_body(metadata_body("1.2.0", "https://updates.example.com/p.zip"))
        .create_async()
        .await;

    let engine = create_engine(&server.url());
    let mut component =
        ComponentConfig::new("my-plugin", "1.0.0", &format!("{}/index.json", server.url()));
    component.display_name = "My Plugin".to_string();

    assert!(engine.details(&component).is_none());
    engine.resolve(&component).await;

    let details = engine.details(&component).unwrap();
    assert_eq!(details.name, "My Plugin");
    assert_eq!(details.version, "1.2.0");
    assert_eq!(details.author, "Someone");
    assert_eq!(details.download_link, "https://updates.example.com/p.zip");
    assert_eq!(details.sections.len(), 2);
}

#[tokio::test]
async fn sections_keep_document_order() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/index.json")
        .with_status(200)
        .with_body(
            r#"{
                "version": "1.2.0",
                "download_url": "https://updates.example.com/p.zip",
                "sections": {
                    "installation": "<p>Upload</p>",
                    "description": "<p>Plugin</p>",
                    "faq": "<p>None</p>",
                    "changelog": "<ul><li>Fixes</li></ul>"
                },
                "icons": { "2x": "https://cdn.example.com/icon-256.png", "1x": "https://cdn.example.com/icon-128.png" }
            }"#,
        )
        .create_async()
        .await;

    let engine = create_engine(&server.url());
    let component =
        ComponentConfig::new("my-plugin", "1.0.0", &format!("{}/index.json", server.url()));

    let resolution = engine.resolve(&component).await;

    let Some(UpdateDecision::UpdateAvailable(offer)) = resolution.decision() else {
        panic!("expected an update, got {resolution:?}");
    };
    let expected = ["installation", "description", "faq", "changelog"];
    assert_eq!(offer.sections.keys().collect::<Vec<_>>(), expected);
    assert_eq!(offer.icons.keys().collect::<Vec<_>>(), ["2x", "1x"]);

    // served again from the cached document
    let details = engine.details(&component).unwrap();
    assert_eq!(details.sections.keys().collect::<Vec<_>>(), expected);
}
