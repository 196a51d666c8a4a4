use thiserror::Error;

/// Failure while fetching remote metadata
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("No server configured")]
    NoSourceConfigured,

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected status: HTTP {status}")]
    UnexpectedStatus { status: u16 },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("GitHub API error for {repo}: {source}")]
    GitHubApi {
        repo: String,
        #[source]
        source: Box<FetchError>,
    },
}

impl FetchError {
    /// Wrap an error with the repository it occurred for
    pub fn github(repo: impl Into<String>, source: FetchError) -> Self {
        FetchError::GitHubApi {
            repo: repo.into(),
            source: Box::new(source),
        }
    }

    /// HTTP status associated with the failure, when one was received
    pub fn code(&self) -> Option<u16> {
        match self {
            FetchError::UnexpectedStatus { status } => Some(*status),
            FetchError::InvalidPayload(_) => Some(200),
            FetchError::GitHubApi { source, .. } => source.code(),
            _ => None,
        }
    }
}
