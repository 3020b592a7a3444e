// src/ingest/trends.rs
//! Trending words used as optional selector context.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{RelayConfig, TrendsKind};
use crate::error::RelayError;
use crate::ingest::types::TrendSource;

pub const WOEID_JAPAN: u32 = 23_424_856;
pub const WOEID_WORLD: u32 = 1;
pub const DEFAULT_X_API_BASE: &str = "https://api.x.com";

/// Trends from the X API v2 (`/2/trends/by/woeid/{id}`), one request per place,
/// concatenated in place order and truncated to `limit`.
pub struct XTrendSource {
    client: reqwest::Client,
    bearer: String,
    base_url: String,
    woeids: Vec<u32>,
    limit: usize,
}

impl XTrendSource {
    pub fn new(client: reqwest::Client, bearer: String, limit: usize) -> Self {
        Self {
            client,
            bearer,
            base_url: DEFAULT_X_API_BASE.to_string(),
            woeids: vec![WOEID_JAPAN, WOEID_WORLD],
            limit,
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_places(mut self, woeids: Vec<u32>) -> Self {
        self.woeids = woeids;
        self
    }

    async fn place(&self, woeid: u32) -> Result<Vec<String>> {
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            data: Vec<Trend>,
        }
        #[derive(Deserialize)]
        struct Trend {
            trend_name: String,
        }

        let url = format!("{}/2/trends/by/woeid/{woeid}", self.base_url);
        let resp: Resp = self
            .client
            .get(&url)
            .bearer_auth(&self.bearer)
            .send()
            .await
            .context("x trends get")?
            .error_for_status()
            .context("x trends non-2xx")?
            .json()
            .await
            .context("x trends body")?;
        Ok(resp.data.into_iter().map(|t| t.trend_name).collect())
    }
}

#[async_trait]
impl TrendSource for XTrendSource {
    async fn fetch(&self) -> Result<Vec<String>> {
        let mut words = Vec::new();
        for woeid in &self.woeids {
            if words.len() >= self.limit {
                break;
            }
            words.extend(self.place(*woeid).await?);
        }
        words.truncate(self.limit);
        Ok(words)
    }

    fn name(&self) -> &'static str {
        "x"
    }
}

/// Fixed words from configuration.
pub struct StaticTrends(pub Vec<String>);

#[async_trait]
impl TrendSource for StaticTrends {
    async fn fetch(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

pub struct NoTrends;

#[async_trait]
impl TrendSource for NoTrends {
    async fn fetch(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// Factory: build the configured trend source on top of the shared HTTP client.
pub fn build_trend_source(
    cfg: &RelayConfig,
    http: reqwest::Client,
) -> Result<Box<dyn TrendSource>, RelayError> {
    Ok(match cfg.trends {
        TrendsKind::None => Box::new(NoTrends),
        TrendsKind::Static => Box::new(StaticTrends(cfg.trend_words.clone())),
        TrendsKind::X => {
            let bearer = cfg
                .secrets
                .x_bearer_token
                .clone()
                .ok_or_else(|| RelayError::Config("missing X_BEARER_TOKEN".into()))?;
            Box::new(XTrendSource::new(http, bearer, cfg.trend_limit))
        }
    })
}
