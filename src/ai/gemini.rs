// src/ai/gemini.rs
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use super::{GenerateFuture, TextModel};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent`. The key travels in the `x-goog-api-key` header.
pub struct GeminiModel {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(http: reqwest::Client, api_key: String, model: String) -> Self {
        Self {
            http,
            api_key,
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: &str) -> Self {
        self.base_url = base.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}
#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}
#[derive(Serialize)]
struct Req<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    #[serde(default)]
    candidates: Vec<Candidate>,
}
#[derive(Deserialize)]
struct Candidate {
    content: Option<RespContent>,
}
#[derive(Deserialize)]
struct RespContent {
    #[serde(default)]
    parts: Vec<RespPart>,
}
#[derive(Deserialize)]
struct RespPart {
    text: Option<String>,
}

impl TextModel for GeminiModel {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(async move {
            let url = format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            );
            let req = Req {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            };

            let body: Resp = self
                .http
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&req)
                .send()
                .await
                .context("gemini post")?
                .error_for_status()
                .context("gemini non-2xx")?
                .json()
                .await
                .context("gemini body")?;

            let text: String = body
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content)
                .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
                .unwrap_or_default();
            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(anyhow!("gemini returned no text"));
            }
            tracing::debug!(model = %self.model, raw = %text, "gemini raw response");
            Ok(text)
        })
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
