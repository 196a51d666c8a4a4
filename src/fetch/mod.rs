//! Remote metadata fetching
//!
//! # Modules
//!
//! - [`json`]: request URL construction and fetch for JSON metadata endpoints
//! - [`github`]: GitHub Releases API URLs and the latest-release fetch
//! - [`asset`]: picks the downloadable asset of a release
//! - [`download`]: auth headers for package downloads from GitHub
//! - [`error`]: fetch error kinds

pub mod asset;
pub mod download;
pub mod error;
pub mod github;
pub mod json;

use std::time::Duration;

#[cfg(test)]
use mockall::automock;

use crate::config::{FETCH_TIMEOUT_SECS, USER_AGENT};
use crate::fetch::error::FetchError;
use crate::metadata::{GitHubReleasePayload, UpdateMetadata};

/// Network access used by the resolution engine
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait MetadataFetcher: Send + Sync {
    /// Fetch and decode a JSON metadata document
    ///
    /// # Arguments
    /// * `url` - Fully built request URL (see [`json::build_request_url`])
    async fn fetch_metadata(&self, url: &str) -> Result<UpdateMetadata, FetchError>;

    /// Fetch the latest release of a GitHub repository
    ///
    /// # Arguments
    /// * `api_url` - `.../repos/{owner}/{repo}/releases/latest`
    /// * `token` - GitHub token, sent as `Authorization: token {token}`
    async fn fetch_release(
        &self,
        api_url: &str,
        token: Option<String>,
    ) -> Result<GitHubReleasePayload, FetchError>;
}

/// reqwest-backed fetcher with a bounded timeout
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl MetadataFetcher for HttpFetcher {
    async fn fetch_metadata(&self, url: &str) -> Result<UpdateMetadata, FetchError> {
        json::fetch_metadata(&self.client, url).await
    }

    async fn fetch_release(
        &self,
        api_url: &str,
        token: Option<String>,
    ) -> Result<GitHubReleasePayload, FetchError> {
        github::fetch_release(&self.client, api_url, token.as_deref()).await
    }
}
