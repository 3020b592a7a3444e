use anyhow::{Context, Result};
use serde::Serialize;

use super::{Message, Publisher};

pub const DEFAULT_BASE_URL: &str = "https://api.line.me";

/// LINE Messaging API push to a single user. Images are not sent; the push API
/// only accepts hosted image URLs.
pub struct LinePublisher {
    client: reqwest::Client,
    token: String,
    to: String,
    base_url: String,
}

impl LinePublisher {
    pub fn new(client: reqwest::Client, token: String, to: String) -> Self {
        Self {
            client,
            token,
            to,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct PushPayload<'a> {
    to: &'a str,
    messages: Vec<TextMessage<'a>>,
}

#[async_trait::async_trait]
impl Publisher for LinePublisher {
    async fn publish(&self, msg: &Message) -> Result<()> {
        if msg.image.is_some() {
            tracing::debug!("LINE push ignores attached image");
        }
        let payload = PushPayload {
            to: &self.to,
            messages: vec![TextMessage {
                kind: "text",
                text: &msg.text,
            }],
        };

        let rsp = self
            .client
            .post(format!("{}/v2/bot/message/push", self.base_url))
            .bearer_auth(&self.token)
            .json(&payload)
            .send()
            .await
            .context("line push")?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            anyhow::bail!("LINE push HTTP {status}: {body}");
        }
        tracing::info!(status = status.as_u16(), "LINE push sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "line"
    }

    /// Push messages only take hosted image urls, so attached bytes are dropped.
    fn supports_images(&self) -> bool {
        false
    }
}
