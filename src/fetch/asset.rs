//! Release asset selection
//!
//! Private repositories and private assets are not reachable through the
//! public `browser_download_url`, so when a token is available the API asset
//! endpoint is returned instead. Downloads from that endpoint must send
//! `Accept: application/octet-stream` (see [`crate::fetch::download`]).

use crate::component::ComponentConfig;
use crate::fetch::github::asset_api_url;
use crate::metadata::{GitHubAsset, GitHubReleasePayload};
use crate::source::GitHubRepo;

/// Asset file name to look for: the configured override, else `{slug}.zip`,
/// else `{real_slug}.zip`.
pub fn wanted_asset_name(component: &ComponentConfig) -> Option<String> {
    if let Some(name) = component.asset_name_override.as_deref().filter(|n| !n.is_empty()) {
        return Some(name.to_string());
    }
    if !component.slug.is_empty() {
        return Some(format!("{}.zip", component.slug));
    }
    component
        .real_slug
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(|s| format!("{s}.zip"))
}

/// Resolve the package URL of a release.
///
/// Selection order: exact case-insensitive name match, first `.zip` asset,
/// then the release source archive. Returns `None` when the release offers
/// none of these.
pub fn resolve_download_url(
    api_base: &str,
    repo: &GitHubRepo,
    release: &GitHubReleasePayload,
    component: &ComponentConfig,
    has_token: bool,
) -> Option<String> {
    let wanted = wanted_asset_name(component).map(|n| n.to_lowercase());

    let named = wanted.as_deref().and_then(|wanted| {
        release
            .assets
            .iter()
            .find(|a| !a.name.is_empty() && a.name.to_lowercase() == wanted)
    });
    let zip = || {
        release
            .assets
            .iter()
            .find(|a| a.name.to_lowercase().ends_with(".zip"))
    };

    if let Some(asset) = named.or_else(zip) {
        return Some(asset_url(api_base, repo, asset, has_token));
    }

    release.zipball_url.clone().filter(|u| !u.is_empty())
}

fn asset_url(api_base: &str, repo: &GitHubRepo, asset: &GitHubAsset, has_token: bool) -> String {
    match asset.id {
        Some(id) if has_token => asset_api_url(api_base, repo, id),
        _ => asset.browser_download_url.clone(),
    }
}
