// src/ai/select.rs
//! Selector: prompt the text model with the unseen candidates and turn its reply
//! into a [`SelectionResult`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::extract::extract_json_object;
use super::DynTextModel;
use crate::config::PromptStyle;
use crate::error::{RelayError, Stage};
use crate::ingest::NewsItem;

/// Used when a digest reply carries no summary.
pub const MISSING_SUMMARY: &str = "要約なし";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Digest { summary: String, hashtags: Vec<String> },
    Post { text: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub selected_identifier: String,
    pub payload: Payload,
}

#[async_trait]
pub trait Selector: Send + Sync {
    /// Pick one of `unseen` and produce publishable text for it.
    /// `context` is optional free text (e.g. trending words); may be empty.
    async fn select(
        &self,
        unseen: &[NewsItem],
        context: &[String],
    ) -> Result<SelectionResult, RelayError>;
}

/// Selector backed by a generative text model.
pub struct ModelSelector {
    model: DynTextModel,
    style: PromptStyle,
}

impl ModelSelector {
    pub fn new(model: DynTextModel, style: PromptStyle) -> Self {
        Self { model, style }
    }
}

#[async_trait]
impl Selector for ModelSelector {
    async fn select(
        &self,
        unseen: &[NewsItem],
        context: &[String],
    ) -> Result<SelectionResult, RelayError> {
        let prompt = build_prompt(self.style, unseen, context);
        debug!(provider = self.model.name(), chars = prompt.chars().count(), "selector prompt built");
        let raw = self
            .model
            .generate(&prompt)
            .await
            .map_err(|e| RelayError::upstream(Stage::Model, e))?;
        parse_selection(&raw, self.style).map_err(|e| {
            warn!(raw = %raw, "unparseable model reply");
            e
        })
    }
}

#[derive(Serialize)]
struct PromptItem<'a> {
    title: &'a str,
    url: &'a str,
}

/// Prompt wording is free; the JSON shape requested at the end is what parsing relies on.
pub fn build_prompt(style: PromptStyle, unseen: &[NewsItem], context: &[String]) -> String {
    // Titles and urls only, to keep the prompt small.
    let items: Vec<PromptItem<'_>> = unseen
        .iter()
        .map(|n| PromptItem {
            title: &n.title,
            url: &n.identifier,
        })
        .collect();
    let items_json = serde_json::to_string(&items).unwrap_or_else(|_| "[]".to_string());

    match style {
        PromptStyle::Digest => format!(
            r##"以下の未送信ニュース一覧から重要な 1 件を選び、以下の JSON 形式だけで返してください。
絶対に JSON の外に文章や説明を書かないこと。改行・補足禁止。
hashtagsは女子高生（JK）ぽい、少し皮肉の効いた言い回しでお願いします。

形式:
{{
    "selected_url": "選んだニュースのURL",
    "summary": "250文字以内の要約。ニュース内容＋皮肉コメント。SNS上の平均的な反応を元にコメントし、良い点と悪い点どちらも言及。文末は女子高生口語（〜だよね、〜じゃん、〜なの等）",
    "hashtags": ["#タグ1", "#タグ2", "#タグ3"]
}}

ニュース一覧:
{items_json}
"##
        ),
        PromptStyle::Post => {
            let trends = if context.is_empty() {
                "なし".to_string()
            } else {
                context.join("、")
            };
            format!(
                r#"以下のニュース一覧から重要な1件を選び、以下のJSON形式だけで返してください。

・ハッシュタグ禁止
・150〜200文字
・皮肉＋JK口調
・文頭は【速報】【朗報】【悲報】のいずれか
・絵文字を適度に使う
・トレンドワードを自然に混ぜる（無理やりはNG）
・「共感 → ツッコミ → 軽いオチ」の構成

トレンドワード: {trends}

形式:
{{
  "selected_url": "ニュースURL",
  "text": "投稿する本文（150〜200文字）"
}}

ニュース一覧:
{items_json}
"#
            )
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Tags {
    List(Vec<String>),
    Text(String),
}

impl Tags {
    fn into_vec(self) -> Vec<String> {
        let raw = match self {
            Tags::List(v) => v,
            Tags::Text(s) => s.split_whitespace().map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Deserialize)]
struct RawSelection {
    #[serde(default, alias = "selected_identifier", alias = "url")]
    selected_url: Option<String>,
    summary: Option<String>,
    hashtags: Option<Tags>,
    text: Option<String>,
}

/// Extract and validate the JSON object of a model reply.
pub fn parse_selection(raw: &str, style: PromptStyle) -> Result<SelectionResult, RelayError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| RelayError::MalformedResponse("no JSON object in model reply".into()))?;
    let parsed: RawSelection = serde_json::from_str(json)
        .map_err(|e| RelayError::MalformedResponse(format!("model reply is not valid JSON: {e}")))?;

    let selected_identifier = parsed
        .selected_url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| RelayError::MalformedResponse("reply has no selected_url".into()))?;

    let payload = match style {
        PromptStyle::Digest => Payload::Digest {
            summary: parsed
                .summary
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| MISSING_SUMMARY.to_string()),
            hashtags: parsed.hashtags.map(Tags::into_vec).unwrap_or_default(),
        },
        PromptStyle::Post => Payload::Post {
            text: parsed
                .text
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .ok_or_else(|| RelayError::MalformedResponse("reply has no text".into()))?,
        },
    };

    Ok(SelectionResult {
        selected_identifier,
        payload,
    })
}
