//! word-post: draw a random three-kana word, illustrate it, and post it once.

use std::process::ExitCode;

use news_relay::metrics::Metrics;
use news_relay::wordpost::WordPoster;
use news_relay::{logging, RelayConfig, RunOutcome};
use tracing::{error, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    logging::init_tracing();

    let metrics = Metrics::install()
        .map_err(|e| warn!(error = %format!("{e:#}"), "metrics recorder not installed"))
        .ok();

    let cfg = match RelayConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::from(1);
        }
    };

    let outcome = match WordPoster::from_config(&cfg) {
        Ok(poster) => poster.run().await,
        Err(e) => RunOutcome::Failed(e),
    };

    if let (Some(m), Some(path)) = (&metrics, &cfg.metrics_path) {
        m.mark_run_finished();
        if let Err(e) = m.write_textfile(path) {
            warn!(error = %format!("{e:#}"), "metrics textfile not written");
        }
    }

    ExitCode::from(outcome.exit_code())
}
