//! Error taxonomy for the feed core.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Payload matched none of the recognised shapes.
    #[error("parse error: {0}")]
    Parse(String),

    /// Network failure or non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("timeout after {0} ms")]
    Timeout(u64),

    /// Every strategy for one source failed; reasons are in strategy order.
    #[error("all strategies failed for {source_key}: {}", .reasons.join("; "))]
    AllStrategiesFailed {
        source_key: String,
        reasons: Vec<String>,
    },

    #[error("unknown feed source: {0}")]
    UnknownSource(String),
}

impl FeedError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, FeedError::Timeout(_))
    }
}

impl From<serde_json::Error> for FeedError {
    fn from(e: serde_json::Error) -> Self {
        FeedError::Parse(format!("json: {e}"))
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        FeedError::Transport(e.to_string())
    }
}

/// Storage failures of the freshness cache. Callers log these and carry on.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
