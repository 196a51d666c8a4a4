//! JSON metadata endpoint fetch

use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::fetch::error::FetchError;
use crate::metadata::UpdateMetadata;
use crate::source::is_json_file;

/// Build the request URL for a JSON metadata endpoint.
///
/// A source ending in `.json` is a static file and is used as is. Anything
/// else is treated as a dynamic update server and receives
/// `action=get_metadata&slug=..&key=..&domain=..` so one server can answer
/// for many components and sites.
pub fn build_request_url(server: &str, slug: &str, key: &str, host: &str) -> String {
    let server = server.trim();
    if is_json_file(server) {
        return server.to_string();
    }

    let base = server.trim_end_matches('/');
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("action", "get_metadata")
        .append_pair("slug", slug)
        .append_pair("key", key)
        .append_pair("domain", host)
        .finish();

    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

/// Host part of the site URL, used as the `domain` query parameter
pub fn site_host(site_url: &str) -> String {
    Url::parse(site_url.trim_end_matches('/'))
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| site_url.to_string())
}

pub(crate) async fn fetch_metadata(
    client: &reqwest::Client,
    url: &str,
) -> Result<UpdateMetadata, FetchError> {
    debug!("Fetching metadata: {}", url);

    let response = client
        .get(url)
        .header("Accept", "application/json")
        .send()
        .await?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        warn!("Metadata endpoint returned status {}: {}", status, url);
        return Err(FetchError::UnexpectedStatus {
            status: status.as_u16(),
        });
    }

    let body = response.text().await?;
    debug!("Metadata response: {}", body.trim());

    parse_metadata(&body)
}

/// Decode a metadata document; anything but an object with a version is invalid
pub fn parse_metadata(body: &str) -> Result<UpdateMetadata, FetchError> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        warn!("Failed to parse metadata response: {}", e);
        FetchError::InvalidPayload(format!("Invalid JSON: {e}"))
    })?;

    if !value.is_object() {
        return Err(FetchError::InvalidPayload(
            "Invalid JSON: expected an object".to_string(),
        ));
    }

    let meta: UpdateMetadata = serde_json::from_value(value)
        .map_err(|e| FetchError::InvalidPayload(e.to_string()))?;

    if meta.version.trim().is_empty() {
        return Err(FetchError::InvalidPayload("missing version".to_string()));
    }

    Ok(meta)
}
