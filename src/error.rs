// src/error.rs
//! Failure classes of a relay run.

use std::fmt;

/// External stage a failure is attributed to. Used for log fields and metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Feed,
    Trends,
    Model,
    Image,
    Publish,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Feed => "feed",
            Stage::Trends => "trends",
            Stage::Model => "model",
            Stage::Image => "image",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Feed, model or publish endpoint unreachable or answered with an error status.
    #[error("{stage} upstream unavailable: {cause:#}")]
    UpstreamUnavailable { stage: Stage, cause: anyhow::Error },

    /// Model output could not be parsed, or it picked an identifier outside the candidates.
    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    /// Publishing succeeded but the ledger could not be rewritten.
    #[error("history write failed: {0}")]
    HistoryWrite(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl RelayError {
    pub fn upstream(stage: Stage, cause: anyhow::Error) -> Self {
        RelayError::UpstreamUnavailable { stage, cause }
    }

    /// Short label for the `relay_failures_total` counter.
    pub fn label(&self) -> &'static str {
        match self {
            RelayError::UpstreamUnavailable { stage, .. } => stage.as_str(),
            RelayError::MalformedResponse(_) => "malformed",
            RelayError::HistoryWrite(_) => "history",
            RelayError::Config(_) => "config",
        }
    }
}
