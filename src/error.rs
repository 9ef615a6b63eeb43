//! Error types for curbside.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CurbsideError>;

#[derive(Debug, Error)]
pub enum CurbsideError {
    /// The feature source could not be opened or read.
    #[error("Failed to load feature source: {0}")]
    Load(String),

    /// The source was read but is not a point-feature collection.
    #[error("Failed to parse feature collection: {0}")]
    Parse(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Failed to build spatial index: {0}")]
    IndexBuild(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The background parse task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    TaskJoin(String),
}

impl From<std::io::Error> for CurbsideError {
    fn from(err: std::io::Error) -> Self {
        CurbsideError::Load(err.to_string())
    }
}

impl From<serde_json::Error> for CurbsideError {
    fn from(err: serde_json::Error) -> Self {
        CurbsideError::Parse(err.to_string())
    }
}

impl From<tokio::task::JoinError> for CurbsideError {
    fn from(err: tokio::task::JoinError) -> Self {
        CurbsideError::TaskJoin(err.to_string())
    }
}

impl CurbsideError {
    /// Load and parse failures leave the store usable in an empty state.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CurbsideError::Load(_) | CurbsideError::Parse(_))
    }
}
