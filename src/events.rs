//! Structured failure events for operators

use serde::Serialize;
use tracing::warn;

use crate::fetch::error::FetchError;

/// A metadata fetch that produced no decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    pub slug: String,
    /// Source URL the fetch was made against
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
}

impl FetchFailure {
    /// Non-200 responses carry only a `code`; everything else a `message`
    pub fn new(slug: &str, server: &str, error: &FetchError) -> Self {
        let status_only = match error {
            FetchError::UnexpectedStatus { .. } => true,
            FetchError::GitHubApi { source, .. } => {
                matches!(**source, FetchError::UnexpectedStatus { .. })
            }
            _ => false,
        };
        Self {
            slug: slug.to_string(),
            server: server.to_string(),
            message: (!status_only).then(|| error.to_string()),
            code: error.code(),
        }
    }
}

/// Receives failure events raised while resolving
pub trait FetchObserver: Send + Sync {
    fn on_fetch_failed(&self, failure: &FetchFailure);
}

/// Emits failures as `warn!` events with structured fields
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FetchObserver for TracingObserver {
    fn on_fetch_failed(&self, failure: &FetchFailure) {
        warn!(
            event = "uupd_metadata_fetch_failed",
            slug = %failure.slug,
            server = %failure.server,
            code = failure.code,
            error = failure.message.as_deref(),
            "Metadata fetch failed"
        );
    }
}
