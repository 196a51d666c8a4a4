//! Resolution results persisted in the SQLite store

mod helper;

use mockito::Server;
use tempfile::TempDir;

use helper::{create_engine_with_store, metadata_body};
use update_resolver::cache::SqliteStore;
use update_resolver::component::ComponentConfig;
use update_resolver::engine::{NoDecision, Resolution};

#[tokio::test]
async fn cached_metadata_survives_reopening_the_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("cache.db");

    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/index.json")
        .with_status(200)
        .with_body(metadata_body("1.2.0", "https://updates.example.com/p.zip"))
        .expect(1)
        .create_async()
        .await;
    let component =
        ComponentConfig::new("my-plugin", "1.0.0", &format!("{}/index.json", server.url()));

    {
        let engine = create_engine_with_store(SqliteStore::new(&db_path).unwrap(), &server.url());
        assert!(engine.resolve(&component).await.is_update_available());
    }

    let engine = create_engine_with_store(SqliteStore::new(&db_path).unwrap(), &server.url());
    assert!(engine.resolve(&component).await.is_update_available());

    mock.assert_async().await;
}

#[tokio::test]
async fn cached_failure_survives_reopening_the_database() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("cache.db");

    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/index.json")
        .with_status(500)
        .expect(1)
        .create_async()
        .await;
    let component =
        ComponentConfig::new("my-plugin", "1.0.0", &format!("{}/index.json", server.url()));

    {
        let engine = create_engine_with_store(SqliteStore::new(&db_path).unwrap(), &server.url());
        assert!(engine.resolve(&component).await.decision().is_none());
    }

    let engine = create_engine_with_store(SqliteStore::new(&db_path).unwrap(), &server.url());
    assert!(matches!(
        engine.resolve(&component).await,
        Resolution::NoDecision(NoDecision::CachedFailure)
    ));

    mock.assert_async().await;
}
