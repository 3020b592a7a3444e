use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::ingest::normalize_text;
use crate::ingest::types::{FeedFetcher, NewsItem};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
}

/// RSS 2.0 feed, either fetched over HTTP or parsed from an in-memory document.
pub struct RssFeed {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssFeed {
    pub fn from_url(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    pub fn from_fixture(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    /// Items without a link have no identifier and are skipped before `limit` applies.
    pub fn parse_items(xml: &str, limit: usize) -> Result<Vec<NewsItem>> {
        let t0 = std::time::Instant::now();
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let mut out = Vec::with_capacity(limit.min(rss.channel.item.len()));
        for it in rss.channel.item {
            if out.len() >= limit {
                break;
            }
            let Some(identifier) = it.link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty())
            else {
                tracing::debug!(title = ?it.title, "rss item without link skipped");
                continue;
            };
            out.push(NewsItem {
                title: normalize_text(it.title.as_deref().unwrap_or_default()),
                summary: normalize_text(it.description.as_deref().unwrap_or_default()),
                identifier,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("relay_feed_parse_ms").record(ms);
        Ok(out)
    }
}

#[async_trait]
impl FeedFetcher for RssFeed {
    async fn fetch(&self, limit: usize) -> Result<Vec<NewsItem>> {
        let items = match &self.mode {
            Mode::Fixture(s) => Self::parse_items(s, limit)?,
            Mode::Http { url, client } => {
                let body = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("rss http get {url}"))?
                    .error_for_status()
                    .context("rss non-2xx")?
                    .text()
                    .await
                    .context("rss http .text()")?;
                Self::parse_items(&body, limit)?
            }
        };
        counter!("relay_candidates_total").increment(items.len() as u64);
        Ok(items)
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}

// HTML entities that are not valid XML but show up in real feeds.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
