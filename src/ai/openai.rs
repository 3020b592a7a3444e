// src/ai/openai.rs
use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use super::{GenerateFuture, TextModel};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// OpenAI-compatible Chat Completions provider.
pub struct OpenAiModel {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiModel {
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

impl TextModel for OpenAiModel {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(async move {
            #[derive(Serialize)]
            struct Msg<'a> {
                role: &'a str,
                content: &'a str,
            }
            #[derive(Serialize)]
            struct Req<'a> {
                model: &'a str,
                messages: Vec<Msg<'a>>,
                temperature: f32,
            }
            #[derive(Deserialize)]
            struct Resp {
                choices: Vec<Choice>,
            }
            #[derive(Deserialize)]
            struct Choice {
                message: ChoiceMsg,
            }
            #[derive(Deserialize)]
            struct ChoiceMsg {
                content: Option<String>,
            }

            let req = Req {
                model: &self.model,
                messages: vec![Msg {
                    role: "user",
                    content: prompt,
                }],
                temperature: 0.7,
            };

            let body: Resp = self
                .http
                .post(format!("{}/v1/chat/completions", self.base_url))
                .bearer_auth(&self.api_key)
                .json(&req)
                .send()
                .await
                .context("openai post")?
                .error_for_status()
                .context("openai non-2xx")?
                .json()
                .await
                .context("openai body")?;

            let content = body
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.message.content)
                .unwrap_or_default();
            let content = content.trim().to_string();
            if content.is_empty() {
                return Err(anyhow!("openai returned no content"));
            }
            tracing::debug!(model = %self.model, raw = %content, "openai raw response");
            Ok(content)
        })
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
