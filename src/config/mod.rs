// src/config/mod.rs
//! Relay configuration: optional TOML file + environment overrides, built once at start.

pub mod ai;

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::RelayError;
use crate::history::{DEFAULT_HISTORY_CAP, DEFAULT_HISTORY_PATH};
use ai::{ModelConfig, ModelSection};

pub const DEFAULT_CONFIG_PATH: &str = "config/relay.toml";
pub const ENV_CONFIG_PATH: &str = "RELAY_CONFIG_PATH";
pub const DEFAULT_FEED_URL: &str = "https://www3.nhk.or.jp/rss/news/cat0.xml";
pub const DEFAULT_FEED_LIMIT: usize = 10;
pub const DEFAULT_TREND_LIMIT: usize = 5;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Prompt and message shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptStyle {
    /// Summary + hashtags + url (messaging).
    Digest,
    /// Single post text + url (social).
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublisherKind {
    Line,
    X,
    Discord,
    DryRun,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendsKind {
    None,
    X,
    Static,
}

/// Credentials. Only ever read from the environment.
#[derive(Clone, Default)]
pub struct Secrets {
    pub line_token: Option<String>,
    pub line_user_id: Option<String>,
    pub x_bearer_token: Option<String>,
    pub discord_webhook_url: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // never print values
        f.debug_struct("Secrets")
            .field("line_token", &self.line_token.is_some())
            .field("line_user_id", &self.line_user_id.is_some())
            .field("x_bearer_token", &self.x_bearer_token.is_some())
            .field("discord_webhook_url", &self.discord_webhook_url.is_some())
            .finish()
    }
}

/// On-disk shape of `config/relay.toml`. Secrets do not belong here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub feed_url: Option<String>,
    pub feed_limit: Option<usize>,
    pub history_path: Option<PathBuf>,
    pub history_cap: Option<usize>,
    pub style: Option<String>,
    pub publisher: Option<String>,
    pub trends: Option<String>,
    pub trend_words: Option<Vec<String>>,
    pub trend_limit: Option<usize>,
    pub http_timeout_secs: Option<u64>,
    pub image_space: Option<String>,
    pub metrics_path: Option<PathBuf>,
    pub model: ModelSection,
}

impl FileConfig {
    pub fn parse(s: &str) -> Result<Self, RelayError> {
        toml::from_str(s).map_err(|e| RelayError::Config(format!("invalid relay config: {e}")))
    }
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub feed_url: String,
    pub feed_limit: usize,
    pub history_path: PathBuf,
    pub history_cap: usize,
    pub style: PromptStyle,
    pub publisher: PublisherKind,
    pub model: ModelConfig,
    pub trends: TrendsKind,
    pub trend_words: Vec<String>,
    pub trend_limit: usize,
    pub http_timeout_secs: u64,
    pub image_space: Option<String>,
    pub metrics_path: Option<PathBuf>,
    pub secrets: Secrets,
}

impl RelayConfig {
    /// Load using the process environment:
    /// 1) $RELAY_CONFIG_PATH (must exist)
    /// 2) config/relay.toml (optional)
    /// then environment overrides.
    pub fn load() -> Result<Self, RelayError> {
        let env = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
        let file = match env(ENV_CONFIG_PATH) {
            Some(p) => {
                let path = PathBuf::from(p);
                if !path.exists() {
                    return Err(RelayError::Config(format!(
                        "{ENV_CONFIG_PATH} points to non-existent path {}",
                        path.display()
                    )));
                }
                read_file_config(&path)?
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    read_file_config(path)?
                } else {
                    FileConfig::default()
                }
            }
        };
        let cfg = Self::from_sources(file, &env)?;
        info!(
            feed = %cfg.feed_url,
            style = ?cfg.style,
            publisher = ?cfg.publisher,
            model = %cfg.model.name,
            key_len = cfg.model.api_key.len(),
            "relay config loaded"
        );
        Ok(cfg)
    }

    /// Merge a parsed file with an environment lookup and validate the result.
    pub fn from_sources<F>(file: FileConfig, env: &F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let style_raw = env("RELAY_STYLE").or(file.style).unwrap_or_else(|| "digest".into());
        let style = match style_raw.trim().to_ascii_lowercase().as_str() {
            "digest" => PromptStyle::Digest,
            "post" => PromptStyle::Post,
            other => return Err(RelayError::Config(format!("unknown style: {other}"))),
        };

        let publisher_raw = env("RELAY_PUBLISHER")
            .or(file.publisher)
            .unwrap_or_else(|| "line".into());
        let publisher = match publisher_raw.trim().to_ascii_lowercase().as_str() {
            "line" => PublisherKind::Line,
            "x" | "twitter" => PublisherKind::X,
            "discord" => PublisherKind::Discord,
            "dry-run" | "dryrun" | "stdout" => PublisherKind::DryRun,
            other => return Err(RelayError::Config(format!("unknown publisher: {other}"))),
        };

        let trends_raw = env("RELAY_TRENDS").or(file.trends).unwrap_or_else(|| "none".into());
        let trends = match trends_raw.trim().to_ascii_lowercase().as_str() {
            "none" | "" => TrendsKind::None,
            "x" => TrendsKind::X,
            "static" => TrendsKind::Static,
            other => return Err(RelayError::Config(format!("unknown trends source: {other}"))),
        };

        let trend_words = match env("RELAY_TREND_WORDS") {
            Some(raw) => split_list(&raw),
            None => file.trend_words.unwrap_or_default(),
        };

        let secrets = Secrets {
            line_token: env("LINE_TOKEN"),
            line_user_id: env("LINE_USER_ID"),
            x_bearer_token: env("X_BEARER_TOKEN"),
            discord_webhook_url: env("DISCORD_WEBHOOK_URL"),
        };

        let cfg = Self {
            feed_url: env("RELAY_FEED_URL")
                .or(file.feed_url)
                .unwrap_or_else(|| DEFAULT_FEED_URL.to_string()),
            feed_limit: parse_num(env, "RELAY_FEED_LIMIT")?
                .or(file.feed_limit)
                .unwrap_or(DEFAULT_FEED_LIMIT),
            history_path: env("RELAY_HISTORY_PATH")
                .map(PathBuf::from)
                .or(file.history_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_PATH)),
            history_cap: parse_num(env, "RELAY_HISTORY_CAP")?
                .or(file.history_cap)
                .unwrap_or(DEFAULT_HISTORY_CAP),
            style,
            publisher,
            model: ModelConfig::resolve(&file.model, env)?,
            trends,
            trend_words,
            trend_limit: parse_num(env, "RELAY_TREND_LIMIT")?
                .or(file.trend_limit)
                .unwrap_or(DEFAULT_TREND_LIMIT),
            http_timeout_secs: parse_num(env, "RELAY_HTTP_TIMEOUT_SECS")?
                .or(file.http_timeout_secs)
                .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            image_space: env("HF_SPACE_ID").or(file.image_space),
            metrics_path: env("RELAY_METRICS_PATH")
                .map(PathBuf::from)
                .or(file.metrics_path),
            secrets,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Fail before any network call when the selected publisher lacks credentials.
    pub fn validate(&self) -> Result<(), RelayError> {
        let missing = |name: &str| RelayError::Config(format!("missing {name}"));
        match self.publisher {
            PublisherKind::Line => {
                self.secrets.line_token.as_ref().ok_or_else(|| missing("LINE_TOKEN"))?;
                self.secrets.line_user_id.as_ref().ok_or_else(|| missing("LINE_USER_ID"))?;
            }
            PublisherKind::X => {
                self.secrets.x_bearer_token.as_ref().ok_or_else(|| missing("X_BEARER_TOKEN"))?;
            }
            PublisherKind::Discord => {
                self.secrets
                    .discord_webhook_url
                    .as_ref()
                    .ok_or_else(|| missing("DISCORD_WEBHOOK_URL"))?;
            }
            PublisherKind::DryRun => {}
        }
        if self.trends == TrendsKind::X && self.secrets.x_bearer_token.is_none() {
            return Err(missing("X_BEARER_TOKEN (required by RELAY_TRENDS=x)"));
        }
        if self.feed_limit == 0 {
            return Err(RelayError::Config("feed_limit must be > 0".into()));
        }
        if !(1..=DEFAULT_HISTORY_CAP).contains(&self.history_cap) {
            return Err(RelayError::Config(format!(
                "history_cap must be within 1..={DEFAULT_HISTORY_CAP}, got {}",
                self.history_cap
            )));
        }
        Ok(())
    }
}

fn read_file_config(path: &Path) -> Result<FileConfig, RelayError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| RelayError::Config(format!("reading {}: {e}", path.display())))?;
    FileConfig::parse(&raw)
}

fn parse_num<T, F>(env: &F, key: &str) -> Result<Option<T>, RelayError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match env(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| RelayError::Config(format!("{key} is not a number: {raw}"))),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
