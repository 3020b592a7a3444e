// src/ingest/types.rs
use anyhow::Result;

/// One candidate story. `identifier` is the canonical URL and the dedup key.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct NewsItem {
    pub title: String,
    pub summary: String,
    pub identifier: String,
}

#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Items in feed order (most recent first), at most `limit` of them.
    async fn fetch(&self, limit: usize) -> Result<Vec<NewsItem>>;
    fn name(&self) -> &'static str;
}

/// Optional free-text context handed to the selector (e.g. trending words).
#[async_trait::async_trait]
pub trait TrendSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<String>>;
    fn name(&self) -> &'static str;
}
