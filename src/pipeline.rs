// src/pipeline.rs
//! One relay run: load history → fetch → filter → select → validate → publish → record.
//!
//! History is written if and only if the publisher accepted the message. A crash
//! between publish and save can still re-publish on the next run (at-most-once is
//! only guaranteed across clean runs).

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use metrics::counter;
use tracing::{error, info, warn};

use crate::ai::select::{ModelSelector, Selector};
use crate::ai::{build_model, DynTextModel};
use crate::config::RelayConfig;
use crate::error::{RelayError, Stage};
use crate::history::HistoryStore;
use crate::ingest::providers::rss::RssFeed;
use crate::ingest::trends::{build_trend_source, NoTrends};
use crate::ingest::{FeedFetcher, NewsItem, TrendSource};
use crate::message;
use crate::notify::{build_publisher, DynPublisher, Message};

pub use crate::ingest::filter_unseen;

/// Result of a run. `NothingToDo` is a success, not an error.
#[derive(Debug)]
pub enum RunOutcome {
    Published {
        identifier: String,
        published_at: DateTime<Utc>,
    },
    NothingToDo,
    Failed(RelayError),
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, RunOutcome::Failed(_))
    }

    /// 0 for `Published` / `NothingToDo`, 1 for `Failed`.
    pub fn exit_code(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

pub struct NewsRelay {
    store: HistoryStore,
    fetcher: Box<dyn FeedFetcher>,
    trends: Box<dyn TrendSource>,
    selector: Box<dyn Selector>,
    publisher: DynPublisher,
    feed_limit: usize,
}

impl NewsRelay {
    pub fn new(
        store: HistoryStore,
        fetcher: Box<dyn FeedFetcher>,
        selector: Box<dyn Selector>,
        publisher: DynPublisher,
    ) -> Self {
        Self {
            store,
            fetcher,
            trends: Box::new(NoTrends),
            selector,
            publisher,
            feed_limit: crate::config::DEFAULT_FEED_LIMIT,
        }
    }

    pub fn with_trends(mut self, trends: Box<dyn TrendSource>) -> Self {
        self.trends = trends;
        self
    }

    pub fn with_feed_limit(mut self, limit: usize) -> Self {
        self.feed_limit = limit.max(1);
        self
    }

    /// Wire every collaborator from configuration.
    pub fn from_config(cfg: &RelayConfig) -> Result<Self, RelayError> {
        let http = crate::http::build_client(cfg.http_timeout_secs)
            .map_err(|e| RelayError::Config(format!("{e:#}")))?;
        let model: DynTextModel = build_model(&cfg.model, http.clone());
        let publisher = build_publisher(cfg, http.clone())?;
        let trends = build_trend_source(cfg, http.clone())?;
        let store = HistoryStore::new(&cfg.history_path).with_cap(cfg.history_cap);

        Ok(Self::new(
            store,
            Box::new(RssFeed::from_url(cfg.feed_url.clone(), http)),
            Box::new(ModelSelector::new(model, cfg.style)),
            publisher,
        )
        .with_trends(trends)
        .with_feed_limit(cfg.feed_limit))
    }

    pub fn history(&self) -> &HistoryStore {
        &self.store
    }

    /// Run once and report the outcome. Failures are logged here.
    pub async fn run(&self) -> RunOutcome {
        crate::metrics::ensure_described();
        counter!("relay_runs_total").increment(1);

        match self.try_run().await {
            Ok(outcome) => outcome,
            Err(e) => {
                counter!("relay_failures_total", "stage" => e.label()).increment(1);
                error!(error = %e, kind = e.label(), "relay run failed");
                RunOutcome::Failed(e)
            }
        }
    }

    async fn try_run(&self) -> Result<RunOutcome, RelayError> {
        // 1. ledger
        let history = self.store.load();

        // 2. candidates (fetch failure is fatal)
        let candidates = self
            .fetcher
            .fetch(self.feed_limit)
            .await
            .map_err(|e| RelayError::upstream(Stage::Feed, e))?;

        // 3. unseen
        let total = candidates.len();
        let unseen = filter_unseen(candidates, &history);
        counter!("relay_unseen_total").increment(unseen.len() as u64);
        info!(
            feed = self.fetcher.name(),
            candidates = total,
            unseen = unseen.len(),
            history = history.len(),
            "candidates filtered"
        );
        if unseen.is_empty() {
            counter!("relay_nothing_to_do_total").increment(1);
            info!("no unseen items; nothing to publish");
            return Ok(RunOutcome::NothingToDo);
        }

        // 4. optional context (never fatal)
        let context = match self.trends.fetch().await {
            Ok(words) => words,
            Err(e) => {
                counter!("relay_failures_total", "stage" => Stage::Trends.as_str()).increment(1);
                warn!(source = self.trends.name(), error = %format!("{e:#}"), "trend lookup failed, continuing without");
                Vec::new()
            }
        };

        // 5. select + validate
        let selection = self.selector.select(&unseen, &context).await?;
        ensure_selected_is_candidate(&selection.selected_identifier, &unseen)?;

        // 6. format
        let text = message::compose(&selection);

        // 7. publish
        self.publisher
            .publish(&Message::text(text))
            .await
            .map_err(|e| RelayError::upstream(Stage::Publish, e))?;

        // 8. record
        let identifier = selection.selected_identifier;
        if let Err(e) = self.store.record_published(&identifier) {
            error!(%identifier, error = %e, "published but history save failed; item may be re-sent");
            return Err(RelayError::HistoryWrite(e));
        }

        counter!("relay_published_total").increment(1);
        info!(
            %identifier,
            publisher = self.publisher.name(),
            "published and recorded"
        );
        Ok(RunOutcome::Published {
            identifier,
            published_at: Utc::now(),
        })
    }
}

/// The selector must return one of the offered identifiers, verbatim.
pub fn ensure_selected_is_candidate(selected: &str, unseen: &[NewsItem]) -> Result<(), RelayError> {
    let ids: HashSet<&str> = unseen.iter().map(|n| n.identifier.as_str()).collect();
    if ids.contains(selected) {
        Ok(())
    } else {
        Err(RelayError::MalformedResponse(format!(
            "selected identifier {selected:?} is not among the {} unseen candidates",
            unseen.len()
        )))
    }
}
