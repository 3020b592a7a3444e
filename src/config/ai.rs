// src/config/ai.rs
use serde::{Deserialize, Serialize};

use crate::error::RelayError;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelProvider {
    Gemini,
    OpenAi,
}

impl ModelProvider {
    pub fn parse(s: &str) -> Result<Self, RelayError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ModelProvider::Gemini),
            "openai" => Ok(ModelProvider::OpenAi),
            other => Err(RelayError::Config(format!(
                "unsupported model provider: {other}"
            ))),
        }
    }

    /// Environment variable holding the key when the file says `api_key = "ENV"`.
    pub fn key_env(self) -> &'static str {
        match self {
            ModelProvider::Gemini => "GEMINI_API_KEY",
            ModelProvider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            ModelProvider::Gemini => DEFAULT_GEMINI_MODEL,
            ModelProvider::OpenAi => DEFAULT_OPENAI_MODEL,
        }
    }
}

/// `[model]` table of the relay config file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    pub provider: Option<String>,
    pub name: Option<String>,
    /// "ENV" (or absent) means: read from GEMINI_API_KEY / OPENAI_API_KEY (by provider).
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Clone)]
pub struct ModelConfig {
    pub provider: ModelProvider,
    pub name: String,
    pub api_key: String,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for ModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelConfig")
            .field("provider", &self.provider)
            .field("name", &self.name)
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl ModelConfig {
    /// Resolve the section against an environment lookup.
    /// `RELAY_MODEL_PROVIDER` / `RELAY_MODEL` override the file.
    pub fn resolve<F>(section: &ModelSection, env: &F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider_raw = env("RELAY_MODEL_PROVIDER")
            .or_else(|| section.provider.clone())
            .unwrap_or_else(|| "gemini".to_string());
        let provider = ModelProvider::parse(&provider_raw)?;

        let name = env("RELAY_MODEL")
            .or_else(|| section.name.clone())
            .unwrap_or_else(|| provider.default_model().to_string());

        let api_key = match section.api_key.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() && !k.eq_ignore_ascii_case("env") => k.to_string(),
            _ => env(provider.key_env()).unwrap_or_default(),
        };
        if api_key.trim().is_empty() {
            return Err(RelayError::Config(format!(
                "missing {} for model provider {provider_raw}",
                provider.key_env()
            )));
        }

        Ok(Self {
            provider,
            name,
            api_key,
            base_url: section.base_url.clone(),
        })
    }
}
