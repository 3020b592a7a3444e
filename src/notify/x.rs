// src/notify/x.rs
use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::{Image, Message, Publisher};

pub const DEFAULT_BASE_URL: &str = "https://api.x.com";

/// Posts through the X API v2 with an OAuth 2.0 user-context bearer token.
pub struct XPublisher {
    client: reqwest::Client,
    bearer: String,
    base_url: String,
}

impl XPublisher {
    pub fn new(client: reqwest::Client, bearer: String) -> Self {
        Self {
            client,
            bearer,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into().trim_end_matches('/').to_string();
        self
    }

    async fn upload_media(&self, image: &Image) -> Result<String> {
        #[derive(Deserialize)]
        struct Resp {
            data: Uploaded,
        }
        #[derive(Deserialize)]
        struct Uploaded {
            id: String,
        }

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name())
            .mime_str(&image.mime)
            .context("x media mime")?;
        let form = Form::new()
            .part("media", part)
            .text("media_category", "tweet_image");

        let rsp: Resp = self
            .client
            .post(format!("{}/2/media/upload", self.base_url))
            .bearer_auth(&self.bearer)
            .multipart(form)
            .send()
            .await
            .context("x media upload")?
            .error_for_status()
            .context("x media upload non-2xx")?
            .json()
            .await
            .context("x media upload body")?;
        Ok(rsp.data.id)
    }
}

#[derive(Serialize)]
struct Media {
    media_ids: Vec<String>,
}

#[derive(Serialize)]
struct TweetPayload<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    media: Option<Media>,
}

#[async_trait::async_trait]
impl Publisher for XPublisher {
    async fn publish(&self, msg: &Message) -> Result<()> {
        // A failed upload degrades to a text-only post.
        let media = match &msg.image {
            Some(img) => match self.upload_media(img).await {
                Ok(id) => Some(Media { media_ids: vec![id] }),
                Err(e) => {
                    tracing::warn!(error = %format!("{e:#}"), "x media upload failed, posting text only");
                    None
                }
            },
            None => None,
        };

        let payload = TweetPayload {
            text: &msg.text,
            media,
        };
        let rsp = self
            .client
            .post(format!("{}/2/tweets", self.base_url))
            .bearer_auth(&self.bearer)
            .json(&payload)
            .send()
            .await
            .context("x post")?;

        let status = rsp.status();
        if !status.is_success() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(anyhow!("X post HTTP {status}: {body}"));
        }
        tracing::info!(status = status.as_u16(), "X post sent");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "x"
    }
}
