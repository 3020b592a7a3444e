use anyhow::{anyhow, Context, Result};
use reqwest::multipart::{Form, Part};
use serde::Serialize;

use super::{Message, Publisher};

/// Discord message content limit.
const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Clone)]
pub struct DiscordPublisher {
    webhook: String,
    client: reqwest::Client,
}

impl DiscordPublisher {
    pub fn new(client: reqwest::Client, webhook: String) -> Self {
        Self { webhook, client }
    }
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: String,
}

impl DiscordWebhookPayload {
    fn text(text: &str) -> Self {
        Self {
            content: fit_content(text, MAX_CONTENT_CHARS),
        }
    }
}

/// Shorten the body so the last line (the story url) survives the length limit.
fn fit_content(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    match text.rsplit_once('\n') {
        Some((body, last)) if last.chars().count() + 2 <= max => {
            let room = max - last.chars().count() - 2;
            let mut out: String = body.chars().take(room).collect();
            out.push('…');
            out.push('\n');
            out.push_str(last);
            out
        }
        _ => text.chars().take(max).collect(),
    }
}

#[async_trait::async_trait]
impl Publisher for DiscordPublisher {
    async fn publish(&self, msg: &Message) -> Result<()> {
        let payload = DiscordWebhookPayload::text(&msg.text);

        let req = match &msg.image {
            None => self.client.post(&self.webhook).json(&payload),
            Some(img) => {
                let json = serde_json::to_string(&payload).context("discord payload json")?;
                let file = Part::bytes(img.bytes.clone())
                    .file_name(img.file_name())
                    .mime_str(&img.mime)
                    .context("discord image mime")?;
                let form = Form::new().text("payload_json", json).part("files[0]", file);
                self.client.post(&self.webhook).multipart(form)
            }
        };

        let rsp = req.send().await.context("discord webhook request")?;
        if let Err(e) = rsp.error_for_status_ref() {
            return Err(anyhow!("Discord webhook HTTP error: {e}"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}
