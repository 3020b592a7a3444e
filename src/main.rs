//! news-relay: one run of the send-once news relay.
//! Meant to be triggered by cron or a CI schedule; the exit code reports the outcome.

use std::process::ExitCode;

use news_relay::metrics::Metrics;
use news_relay::{logging, NewsRelay, RelayConfig, RunOutcome};
use tracing::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env in local/dev; no-op when the scheduler injects the environment.
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let metrics = match Metrics::install() {
        Ok(m) => Some(m),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "metrics recorder not installed");
            None
        }
    };

    let cfg = match RelayConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(1);
        }
    };

    let outcome = match NewsRelay::from_config(&cfg) {
        Ok(relay) => relay.run().await,
        Err(e) => RunOutcome::Failed(e),
    };

    match &outcome {
        RunOutcome::Published { identifier, published_at } => {
            info!(%identifier, %published_at, "run finished: published")
        }
        RunOutcome::NothingToDo => info!("run finished: nothing to do"),
        RunOutcome::Failed(e) => error!(error = %e, "run finished: failed"),
    }

    if let (Some(m), Some(path)) = (&metrics, &cfg.metrics_path) {
        m.mark_run_finished();
        if let Err(e) = m.write_textfile(path) {
            warn!(error = %format!("{e:#}"), "metrics textfile not written");
        }
    }

    ExitCode::from(outcome.exit_code())
}
