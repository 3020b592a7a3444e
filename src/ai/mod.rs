//! Generative text model abstraction: one prompt in, free text out.
//!
//! Providers do the remote call only. Interpreting the text (JSON extraction,
//! validation) lives in [`select`] and [`extract`].

pub mod extract;
pub mod gemini;
pub mod openai;
pub mod select;

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use crate::config::ai::{ModelConfig, ModelProvider};

pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + 'a>>;

pub trait TextModel: Send + Sync {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a>;
    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Convenient alias used by callers.
pub type DynTextModel = Arc<dyn TextModel>;

/// Factory: build the configured provider on top of the shared HTTP client.
pub fn build_model(cfg: &ModelConfig, http: reqwest::Client) -> DynTextModel {
    match cfg.provider {
        ModelProvider::Gemini => {
            let mut m = gemini::GeminiModel::new(http, cfg.api_key.clone(), cfg.name.clone());
            if let Some(base) = &cfg.base_url {
                m = m.with_base_url(base);
            }
            Arc::new(m)
        }
        ModelProvider::OpenAi => {
            let mut m = openai::OpenAiModel::new(http, cfg.api_key.clone(), cfg.name.clone());
            if let Some(base) = &cfg.base_url {
                m = m.with_base_url(base);
            }
            Arc::new(m)
        }
    }
}

/// Deterministic model for tests and local runs. Records every prompt it receives.
#[derive(Default)]
pub struct MockModel {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// A model whose every call fails, as an unreachable endpoint would.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

impl TextModel for MockModel {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        if let Ok(mut p) = self.prompts.lock() {
            p.push(prompt.to_string());
        }
        let out = self.reply.clone();
        Box::pin(async move { out.ok_or_else(|| anyhow::anyhow!("mock model unavailable")) })
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
