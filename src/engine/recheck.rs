//! Manual "check for updates" trigger
//!
//! A re-check clears every cache entry of one component so the next
//! resolution fetches again. The caller must pass a [`RecheckGuard`].

use md5::{Digest, Md5};
use subtle::ConstantTimeEq;
use thiserror::Error;

use crate::cache::error::CacheError;

#[derive(Debug, Error)]
pub enum RecheckError {
    #[error("Slug {requested:?} does not match tracked component {tracked:?}")]
    SlugMismatch { requested: String, tracked: String },

    #[error("Caller may not update plugins or themes")]
    Forbidden,

    #[error("Security check failed for {action}")]
    InvalidNonce { action: String },

    #[error("Failed to clear cache: {0}")]
    Cache(#[from] CacheError),
}

/// Incoming manual re-check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecheckRequest {
    /// Requested slug, as received
    pub slug: String,
    pub nonce: Option<String>,
    /// Whether the caller holds the update capability
    pub can_update: bool,
}

impl RecheckRequest {
    pub fn new(slug: &str) -> Self {
        Self {
            slug: slug.to_string(),
            nonce: None,
            can_update: true,
        }
    }

    pub fn with_nonce(mut self, nonce: &str) -> Self {
        self.nonce = Some(nonce.to_string());
        self
    }

    /// Requested slug reduced to lowercase `[a-z0-9_-]`
    pub fn sanitized_slug(&self) -> String {
        self.slug
            .chars()
            .filter_map(|c| {
                let c = c.to_ascii_lowercase();
                (c.is_ascii_alphanumeric() || c == '_' || c == '-').then_some(c)
            })
            .collect()
    }
}

/// Action name a re-check nonce is bound to
pub fn recheck_action(slug: &str) -> String {
    format!("uupd_manual_check_{slug}")
}

/// Authorizes manual re-checks
pub trait RecheckGuard: Send + Sync {
    /// Called after the slug matched; `Err` aborts the re-check
    fn authorize(&self, slug: &str, request: &RecheckRequest) -> Result<(), RecheckError>;
}

/// Requires the update capability and, when a secret is configured, a nonce
/// derived from the secret and the re-check action.
#[derive(Debug, Clone, Default)]
pub struct SharedSecretGuard {
    secret: Option<String>,
}

impl SharedSecretGuard {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    /// Nonce a caller must present to re-check `slug`
    pub fn nonce_for(&self, slug: &str) -> Option<String> {
        self.secret
            .as_deref()
            .map(|secret| sign(secret, &recheck_action(slug)))
    }
}

fn sign(secret: &str, action: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(secret.as_bytes());
    hasher.update(b":");
    hasher.update(action.as_bytes());
    hex::encode(hasher.finalize())
}

impl RecheckGuard for SharedSecretGuard {
    fn authorize(&self, slug: &str, request: &RecheckRequest) -> Result<(), RecheckError> {
        if !request.can_update {
            return Err(RecheckError::Forbidden);
        }

        let Some(expected) = self.nonce_for(slug) else {
            return Ok(());
        };
        match request.nonce.as_deref() {
            Some(nonce) if bool::from(nonce.as_bytes().ct_eq(expected.as_bytes())) => Ok(()),
            _ => Err(RecheckError::InvalidNonce {
                action: recheck_action(slug),
            }),
        }
    }
}
