// src/lib.rs
// Public library surface for both binaries and the integration tests.

pub mod ai;
pub mod config;
pub mod error;
pub mod history;
pub mod http;
pub mod ingest;
pub mod logging;
pub mod message;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod wordpost;

// ---- Re-exports for stable public API ----
pub use crate::config::RelayConfig;
pub use crate::error::{RelayError, Stage};
pub use crate::history::HistoryStore;
pub use crate::ingest::NewsItem;
pub use crate::notify::{Message, Publisher};
pub use crate::pipeline::{NewsRelay, RunOutcome};
