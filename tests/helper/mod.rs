//! Shared fixtures for end-to-end tests

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::json;

use update_resolver::cache::{KeyValueStore, MemoryStore};
use update_resolver::engine::UpdateResolutionEngine;
use update_resolver::fetch::HttpFetcher;

pub const SITE_HOST: &str = "example.com";

/// Engine over an in-memory store that talks to `api_base` for GitHub calls
pub fn create_engine(api_base: &str) -> UpdateResolutionEngine<MemoryStore> {
    create_engine_with_store(MemoryStore::default(), api_base)
}

pub fn create_engine_with_store<S: KeyValueStore>(
    store: S,
    api_base: &str,
) -> UpdateResolutionEngine<S> {
    let fetcher = HttpFetcher::new().expect("Failed to create HTTP client");
    UpdateResolutionEngine::new(store, Arc::new(fetcher))
        .with_github_api_base(api_base)
        .with_site_host(SITE_HOST)
}

/// JSON metadata document as served by an update server
pub fn metadata_body(version: &str, download_url: &str) -> String {
    json!({
        "slug": "my-plugin",
        "version": version,
        "author": "Someone",
        "requires": "6.0",
        "requires_php": "7.4",
        "tested": "6.5",
        "download_url": download_url,
        "sections": {
            "description": "<p>Plugin</p>",
            "changelog": "<ul><li>Fixes</li></ul>"
        },
        "icons": { "1x": "https://cdn.example.com/icon.png" }
    })
    .to_string()
}

/// Latest-release payload with `(name, id)` assets
pub fn release_body(tag: &str, assets: &[(&str, u64)]) -> String {
    let assets: Vec<_> = assets
        .iter()
        .map(|(name, id)| {
            json!({
                "name": name,
                "id": id,
                "browser_download_url":
                    format!("https://github.com/owner/repo/releases/download/{tag}/{name}")
            })
        })
        .collect();

    json!({
        "tag_name": tag,
        "html_url": format!("https://github.com/owner/repo/releases/tag/{tag}"),
        "body": "Release notes",
        "assets": assets,
        "zipball_url": format!("https://api.github.com/repos/owner/repo/zipball/{tag}")
    })
    .to_string()
}
