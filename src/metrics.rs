// src/metrics.rs
use std::path::Path;

use anyhow::{Context, Result};
use metrics::{describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time series registration so every series carries HELP text.
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("relay_runs_total", "Relay runs started.");
        describe_counter!("relay_candidates_total", "Items parsed from the feed.");
        describe_counter!("relay_unseen_total", "Candidates not yet in the history ledger.");
        describe_counter!("relay_published_total", "Messages accepted by the publisher.");
        describe_counter!(
            "relay_nothing_to_do_total",
            "Runs that ended with every candidate already sent."
        );
        describe_counter!("relay_failures_total", "Failures, labelled by stage.");
        describe_histogram!("relay_feed_parse_ms", "Feed parse time in milliseconds.");
        describe_gauge!("relay_last_run_ts", "Unix ts when the last run finished.");
    });
}

/// Process-wide Prometheus recorder. Batch runs have no scrape endpoint, so the
/// rendered exposition is written to a textfile at exit.
#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the recorder once; later calls return the same handle.
    pub fn install() -> Result<Self> {
        static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
        let handle = HANDLE
            .get_or_try_init(|| {
                PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")
            })?
            .clone();
        ensure_described();
        Ok(Self { handle })
    }

    /// Stamp the end of a run.
    pub fn mark_run_finished(&self) {
        gauge!("relay_last_run_ts").set(chrono::Utc::now().timestamp() as f64);
    }

    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Write the exposition format to `path` (node_exporter textfile collector style).
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating metrics dir {}", dir.display()))?;
        }
        std::fs::write(path, self.render())
            .with_context(|| format!("writing metrics textfile {}", path.display()))
    }
}
