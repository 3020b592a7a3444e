// tests/relay_pipeline.rs
// End-to-end behaviour of one relay run against in-process fakes and mock HTTP upstreams.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockito::{Matcher, Server};
use serde_json::json;

use news_relay::ai::gemini::GeminiModel;
use news_relay::ai::select::ModelSelector;
use news_relay::ai::{DynTextModel, MockModel};
use news_relay::config::PromptStyle;
use news_relay::ingest::providers::rss::RssFeed;
use news_relay::ingest::trends::StaticTrends;
use news_relay::ingest::{FeedFetcher, NewsItem, TrendSource};
use news_relay::notify::line::LinePublisher;
use news_relay::{HistoryStore, Message, NewsRelay, Publisher, RelayError, RunOutcome, Stage};

// ---------- fakes ----------

struct FixedFeed(Vec<NewsItem>);

#[async_trait]
impl FeedFetcher for FixedFeed {
    async fn fetch(&self, limit: usize) -> anyhow::Result<Vec<NewsItem>> {
        Ok(self.0.iter().take(limit).cloned().collect())
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

struct DownFeed;

#[async_trait]
impl FeedFetcher for DownFeed {
    async fn fetch(&self, _limit: usize) -> anyhow::Result<Vec<NewsItem>> {
        anyhow::bail!("connection refused")
    }
    fn name(&self) -> &'static str {
        "down"
    }
}

struct DownTrends;

#[async_trait]
impl TrendSource for DownTrends {
    async fn fetch(&self) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("429 too many requests")
    }
    fn name(&self) -> &'static str {
        "down"
    }
}

#[derive(Default)]
struct Recorder {
    sent: Mutex<Vec<Message>>,
    fail: bool,
}

impl Recorder {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }
    fn texts(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|m| m.text.clone()).collect()
    }
}

#[async_trait]
impl Publisher for Recorder {
    async fn publish(&self, msg: &Message) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("HTTP 500");
        }
        self.sent.lock().unwrap().push(msg.clone());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "recorder"
    }
}

// ---------- helpers ----------

fn item(id: &str) -> NewsItem {
    NewsItem {
        title: format!("title {id}"),
        summary: format!("summary {id}"),
        identifier: id.to_string(),
    }
}

fn feed(ids: &[&str]) -> Box<dyn FeedFetcher> {
    Box::new(FixedFeed(ids.iter().map(|id| item(id)).collect()))
}

struct Harness {
    _dir: tempfile::TempDir,
    store: HistoryStore,
    model: Arc<MockModel>,
    publisher: Arc<Recorder>,
}

impl Harness {
    fn new(history: &[&str], reply: Option<&str>, publisher: Recorder) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("sent_news.json"));
        if !history.is_empty() {
            let ids: Vec<String> = history.iter().map(|s| s.to_string()).collect();
            store.save(&ids).unwrap();
        }
        let model = Arc::new(match reply {
            Some(r) => MockModel::replying(r),
            None => MockModel::failing(),
        });
        Self {
            _dir: dir,
            store,
            model,
            publisher: Arc::new(publisher),
        }
    }

    fn relay(&self, fetcher: Box<dyn FeedFetcher>, style: PromptStyle) -> NewsRelay {
        let model: DynTextModel = self.model.clone();
        NewsRelay::new(
            self.store.clone(),
            fetcher,
            Box::new(ModelSelector::new(model, style)),
            self.publisher.clone(),
        )
    }
}

// ---------- scenarios ----------

#[tokio::test]
async fn publishes_the_unseen_item_and_records_it() {
    let h = Harness::new(
        &["https://a/1"],
        Some(r##"{"selected_url":"https://a/2","summary":"S","hashtags":["#t"]}"##),
        Recorder::default(),
    );
    let out = h.relay(feed(&["https://a/1", "https://a/2"]), PromptStyle::Digest).run().await;

    assert!(matches!(out, RunOutcome::Published { ref identifier, .. } if identifier == "https://a/2"));
    assert_eq!(h.publisher.texts(), vec!["S\n\n#t\n\nhttps://a/2".to_string()]);
    assert_eq!(h.store.load(), vec!["https://a/1", "https://a/2"]);

    // only unseen candidates are offered to the model
    let prompts = h.model.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("https://a/2"));
    assert!(!prompts[0].contains("https://a/1"));
}

#[tokio::test]
async fn everything_seen_is_nothing_to_do_without_side_effects() {
    let h = Harness::new(&["https://a/1", "https://a/2"], Some("{}"), Recorder::default());
    let before = std::fs::read_to_string(h.store.path()).unwrap();

    let out = h.relay(feed(&["https://a/1", "https://a/2"]), PromptStyle::Digest).run().await;

    assert!(matches!(out, RunOutcome::NothingToDo));
    assert_eq!(out.exit_code(), 0);
    assert!(h.model.prompts().is_empty(), "model must not be called");
    assert!(h.publisher.texts().is_empty(), "publisher must not be called");
    assert_eq!(std::fs::read_to_string(h.store.path()).unwrap(), before);
}

#[tokio::test]
async fn empty_feed_is_nothing_to_do() {
    let h = Harness::new(&[], Some("{}"), Recorder::default());
    let out = h.relay(feed(&[]), PromptStyle::Digest).run().await;
    assert!(matches!(out, RunOutcome::NothingToDo));
    assert!(!h.store.path().exists());
}

#[tokio::test]
async fn publish_failure_leaves_history_untouched() {
    let h = Harness::new(
        &["https://a/1"],
        Some(r#"{"selected_url":"https://a/2","summary":"S","hashtags":[]}"#),
        Recorder::failing(),
    );
    let out = h.relay(feed(&["https://a/1", "https://a/2"]), PromptStyle::Digest).run().await;

    assert!(matches!(
        out,
        RunOutcome::Failed(RelayError::UpstreamUnavailable { stage: Stage::Publish, .. })
    ));
    assert_eq!(out.exit_code(), 1);
    assert_eq!(h.store.load(), vec!["https://a/1"]);
}

#[tokio::test]
async fn selection_outside_candidates_is_rejected() {
    let h = Harness::new(
        &["https://a/1"],
        // picks an already-sent item
        Some(r#"{"selected_url":"https://a/1","summary":"S","hashtags":[]}"#),
        Recorder::default(),
    );
    let out = h.relay(feed(&["https://a/1", "https://a/2"]), PromptStyle::Digest).run().await;

    assert!(matches!(out, RunOutcome::Failed(RelayError::MalformedResponse(_))));
    assert!(h.publisher.texts().is_empty());
    assert_eq!(h.store.load(), vec!["https://a/1"]);
}

#[tokio::test]
async fn unparseable_reply_is_malformed() {
    let h = Harness::new(&[], Some("ごめんなさい、選べません"), Recorder::default());
    let out = h.relay(feed(&["https://a/1"]), PromptStyle::Post).run().await;
    assert!(matches!(out, RunOutcome::Failed(RelayError::MalformedResponse(_))));
    assert!(h.publisher.texts().is_empty());
}

#[tokio::test]
async fn model_outage_fails_without_publishing() {
    let h = Harness::new(&[], None, Recorder::default());
    let out = h.relay(feed(&["https://a/1"]), PromptStyle::Digest).run().await;
    assert!(matches!(
        out,
        RunOutcome::Failed(RelayError::UpstreamUnavailable { stage: Stage::Model, .. })
    ));
    assert!(h.publisher.texts().is_empty());
}

#[tokio::test]
async fn feed_failure_is_fatal() {
    let h = Harness::new(&["https://a/1"], Some("{}"), Recorder::default());
    let out = h.relay(Box::new(DownFeed), PromptStyle::Digest).run().await;
    assert!(matches!(
        out,
        RunOutcome::Failed(RelayError::UpstreamUnavailable { stage: Stage::Feed, .. })
    ));
    assert!(h.model.prompts().is_empty());
    assert_eq!(h.store.load(), vec!["https://a/1"]);
}

#[tokio::test]
async fn trend_failure_is_not_fatal() {
    let h = Harness::new(
        &[],
        Some(r#"{"selected_url":"https://a/1","text":"【速報】やば"}"#),
        Recorder::default(),
    );
    let out = h
        .relay(feed(&["https://a/1"]), PromptStyle::Post)
        .with_trends(Box::new(DownTrends))
        .run()
        .await;
    assert!(out.is_success());
    assert_eq!(h.publisher.texts(), vec!["【速報】やば\nhttps://a/1".to_string()]);
    assert!(h.model.prompts()[0].contains("トレンドワード: なし"));
}

#[tokio::test]
async fn trend_words_reach_the_prompt() {
    let h = Harness::new(
        &[],
        Some(r#"{"selected_url":"https://a/1","text":"【朗報】円安"}"#),
        Recorder::default(),
    );
    h.relay(feed(&["https://a/1"]), PromptStyle::Post)
        .with_trends(Box::new(StaticTrends(vec!["円安".into(), "W杯".into()])))
        .run()
        .await;
    assert!(h.model.prompts()[0].contains("トレンドワード: 円安、W杯"));
}

#[tokio::test]
async fn feed_limit_bounds_the_candidates() {
    let h = Harness::new(
        &[],
        Some(r#"{"selected_url":"https://a/1","summary":"S","hashtags":[]}"#),
        Recorder::default(),
    );
    h.relay(feed(&["https://a/1", "https://a/2", "https://a/3"]), PromptStyle::Digest)
        .with_feed_limit(1)
        .run()
        .await;
    let prompt = &h.model.prompts()[0];
    assert!(prompt.contains("https://a/1"));
    assert!(!prompt.contains("https://a/2"));
}

#[tokio::test]
async fn second_run_finds_nothing_new() {
    let h = Harness::new(
        &[],
        Some(r#"{"selected_url":"https://a/1","summary":"S","hashtags":[]}"#),
        Recorder::default(),
    );
    let first = h.relay(feed(&["https://a/1"]), PromptStyle::Digest).run().await;
    assert!(matches!(first, RunOutcome::Published { .. }));
    let second = h.relay(feed(&["https://a/1"]), PromptStyle::Digest).run().await;
    assert!(matches!(second, RunOutcome::NothingToDo));
    assert_eq!(h.publisher.texts().len(), 1);
}

#[tokio::test]
async fn history_write_failure_after_publish_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "").unwrap();

    let publisher = Arc::new(Recorder::default());
    let model: DynTextModel = Arc::new(MockModel::replying(
        r#"{"selected_url":"https://a/1","summary":"S","hashtags":[]}"#,
    ));
    let relay = NewsRelay::new(
        HistoryStore::new(blocker.join("sent_news.json")),
        feed(&["https://a/1"]),
        Box::new(ModelSelector::new(model, PromptStyle::Digest)),
        publisher.clone(),
    );

    let out = relay.run().await;
    assert!(matches!(out, RunOutcome::Failed(RelayError::HistoryWrite(_))));
    assert_eq!(publisher.texts().len(), 1, "the message did go out");
}

// ---------- over HTTP ----------

const NHK_XML: &str = include_str!("fixtures/nhk_rss.xml");

#[tokio::test]
async fn rss_gemini_line_round_trip() {
    let mut server = Server::new_async().await;
    let seen = "http://www3.nhk.or.jp/news/html/20261017/k10014001.html";
    let pick = "http://www3.nhk.or.jp/news/html/20261017/k10014002.html";

    server
        .mock("GET", "/rss/news/cat0.xml")
        .with_status(200)
        .with_body(NHK_XML)
        .create_async()
        .await;

    let reply = format!(
        "```json\n{}\n```",
        json!({"selected_url": pick, "summary": "株が上がったじゃん", "hashtags": ["#株高"]})
    );
    let gemini = server
        .mock("POST", "/v1beta/models/gemini-2.5-flash:generateContent")
        .match_header("x-goog-api-key", "g-key")
        .with_status(200)
        .with_body(
            json!({"candidates": [{"content": {"parts": [{"text": reply}]}}]}).to_string(),
        )
        .create_async()
        .await;

    let line = server
        .mock("POST", "/v2/bot/message/push")
        .match_header("authorization", "Bearer line-token")
        .match_body(Matcher::Json(json!({
            "to": "U123",
            "messages": [{"type": "text", "text": format!("株が上がったじゃん\n\n#株高\n\n{pick}")}]
        })))
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path().join("sent_news.json"));
    store.save(&[seen.to_string()]).unwrap();

    let http = reqwest::Client::new();
    let model: DynTextModel = Arc::new(
        GeminiModel::new(http.clone(), "g-key".into(), "gemini-2.5-flash".into())
            .with_base_url(&server.url()),
    );
    let relay = NewsRelay::new(
        store.clone(),
        Box::new(RssFeed::from_url(
            format!("{}/rss/news/cat0.xml", server.url()),
            http.clone(),
        )),
        Box::new(ModelSelector::new(model, PromptStyle::Digest)),
        Arc::new(
            LinePublisher::new(http, "line-token".into(), "U123".into())
                .with_base_url(server.url()),
        ),
    );

    let out = relay.run().await;
    assert!(matches!(out, RunOutcome::Published { ref identifier, .. } if identifier == pick));
    gemini.assert_async().await;
    line.assert_async().await;
    assert_eq!(store.load(), vec![seen, pick]);
}

#[tokio::test]
async fn line_rejection_keeps_history() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/v2/bot/message/push")
        .with_status(401)
        .with_body(r#"{"message":"Authentication failed"}"#)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path().join("sent_news.json"));
    let model: DynTextModel = Arc::new(MockModel::replying(
        r#"{"selected_url":"https://a/1","summary":"S","hashtags":[]}"#,
    ));
    let relay = NewsRelay::new(
        store.clone(),
        feed(&["https://a/1"]),
        Box::new(ModelSelector::new(model, PromptStyle::Digest)),
        Arc::new(
            LinePublisher::new(reqwest::Client::new(), "bad".into(), "U1".into())
                .with_base_url(server.url()),
        ),
    );

    let out = relay.run().await;
    match out {
        RunOutcome::Failed(e) => assert!(e.to_string().contains("401"), "{e}"),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(store.load().is_empty());
}
