// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One registered feed endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedSource {
    pub name: String, // display label, stored as `source_name`
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Candidate item exactly as the feed reported it (before normalization).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawItem {
    pub title: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

/// Feed-level failure. The collector logs it and moves on to the next feed.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("feed too large: {size} bytes (max {max})")]
    TooLarge { size: u64, max: u64 },

    #[error("malformed feed: {0}")]
    Malformed(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("no fixture registered for {0}")]
    MissingFixture(String),
}

#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch(&self, source: &FeedSource) -> Result<Vec<RawItem>, FetchError>;
    fn name(&self) -> &'static str;
}
