//! GitHub Releases API fetch

use tracing::{debug, warn};

use crate::fetch::error::FetchError;
use crate::metadata::GitHubReleasePayload;
use crate::source::GitHubRepo;

/// Default base URL for GitHub API
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// `{base}/repos/{owner}/{repo}/releases/latest`
pub fn latest_release_url(api_base: &str, repo: &GitHubRepo) -> String {
    format!(
        "{}/repos/{}/releases/latest",
        api_base.trim_end_matches('/'),
        repo.path()
    )
}

/// `{base}/repos/{owner}/{repo}/releases/assets/{id}`
pub fn asset_api_url(api_base: &str, repo: &GitHubRepo, asset_id: u64) -> String {
    format!(
        "{}/repos/{}/releases/assets/{}",
        api_base.trim_end_matches('/'),
        repo.path(),
        asset_id
    )
}

pub(crate) async fn fetch_release(
    client: &reqwest::Client,
    api_url: &str,
    token: Option<&str>,
) -> Result<GitHubReleasePayload, FetchError> {
    debug!("GitHub fetch: {}", api_url);

    let mut request = client
        .get(api_url)
        .header("Accept", "application/vnd.github.v3+json");
    if let Some(token) = token.filter(|t| !t.is_empty()) {
        request = request.header("Authorization", format!("token {token}"));
    }

    let response = request.send().await?;
    let status = response.status();
    if status != reqwest::StatusCode::OK {
        warn!("GitHub API returned status {}: {}", status, api_url);
        return Err(FetchError::UnexpectedStatus {
            status: status.as_u16(),
        });
    }

    let release: GitHubReleasePayload = response.json().await.map_err(|e| {
        warn!("Failed to parse GitHub release response: {}", e);
        FetchError::InvalidPayload(e.to_string())
    })?;

    Ok(release)
}
