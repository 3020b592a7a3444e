// src/notify/mod.rs
//! Publishers: deliver the final message to its destination platform.

pub mod discord;
pub mod line;
pub mod x;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{PublisherKind, RelayConfig};
use crate::error::RelayError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl Image {
    pub fn file_name(&self) -> &'static str {
        match self.mime.as_str() {
            "image/jpeg" => "image.jpg",
            "image/webp" => "image.webp",
            "image/gif" => "image.gif",
            _ => "image.png",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub image: Option<Image>,
}

impl Message {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: Option<Image>) -> Self {
        self.image = image;
        self
    }
}

#[async_trait::async_trait]
pub trait Publisher: Send + Sync {
    /// `Ok` only when the platform accepted the message.
    async fn publish(&self, msg: &Message) -> Result<()>;
    fn name(&self) -> &'static str;

    /// Whether an attached image reaches the platform. `false` means it is dropped.
    fn supports_images(&self) -> bool {
        true
    }
}

pub type DynPublisher = Arc<dyn Publisher>;

/// Logs the message instead of sending it.
pub struct DryRunPublisher;

#[async_trait::async_trait]
impl Publisher for DryRunPublisher {
    async fn publish(&self, msg: &Message) -> Result<()> {
        tracing::info!(
            image_bytes = msg.image.as_ref().map(|i| i.bytes.len()).unwrap_or(0),
            "dry run, not publishing:\n{}",
            msg.text
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

/// Factory: build the configured publisher on top of the shared HTTP client.
pub fn build_publisher(cfg: &RelayConfig, http: reqwest::Client) -> Result<DynPublisher, RelayError> {
    let missing = |name: &str| RelayError::Config(format!("missing {name}"));
    let s = &cfg.secrets;
    let publisher: DynPublisher = match cfg.publisher {
        PublisherKind::Line => Arc::new(line::LinePublisher::new(
            http,
            s.line_token.clone().ok_or_else(|| missing("LINE_TOKEN"))?,
            s.line_user_id.clone().ok_or_else(|| missing("LINE_USER_ID"))?,
        )),
        PublisherKind::X => Arc::new(x::XPublisher::new(
            http,
            s.x_bearer_token.clone().ok_or_else(|| missing("X_BEARER_TOKEN"))?,
        )),
        PublisherKind::Discord => Arc::new(discord::DiscordPublisher::new(
            http,
            s.discord_webhook_url
                .clone()
                .ok_or_else(|| missing("DISCORD_WEBHOOK_URL"))?,
        )),
        PublisherKind::DryRun => Arc::new(DryRunPublisher),
    };
    Ok(publisher)
}
