//! Request headers for downloading a resolved package
//!
//! The host downloads packages itself; for GitHub URLs it needs the token
//! attached, and the API asset endpoint only streams the binary when asked
//! for `application/octet-stream`.

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};

use crate::config::USER_AGENT as DEFAULT_USER_AGENT;

/// Whether `url` points at GitHub (web or API)
pub fn is_github_url(url: &str) -> bool {
    url.contains("github.com/")
}

/// Whether `url` is the API asset-download endpoint
pub fn is_asset_api_url(url: &str) -> bool {
    url.contains("api.github.com/repos/") && url.contains("/releases/assets/")
}

/// Decorate download headers for `url`.
///
/// Non-GitHub URLs and requests without a token are returned unchanged.
/// An existing `User-Agent` is kept.
pub fn download_headers(url: &str, token: Option<&str>, mut headers: HeaderMap) -> HeaderMap {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        return headers;
    };
    if !is_github_url(url) {
        return headers;
    }

    if let Ok(value) = HeaderValue::from_str(&format!("token {token}")) {
        headers.insert(AUTHORIZATION, value);
    }
    if !headers.contains_key(USER_AGENT) {
        headers.insert(USER_AGENT, HeaderValue::from_static(DEFAULT_USER_AGENT));
    }
    if is_asset_api_url(url) {
        headers.insert(ACCEPT, HeaderValue::from_static("application/octet-stream"));
    }

    headers
}
