// src/http.rs
use std::time::Duration;

use anyhow::{Context, Result};

pub const USER_AGENT: &str = concat!("news-relay/", env!("CARGO_PKG_VERSION"));
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared HTTP client for one run. Upstreams give no timeout guarantees, so both
/// connect and whole-request timeouts are always set.
pub fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
        .context("building reqwest client")
}
