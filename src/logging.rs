// src/logging.rs
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "news_relay=info,warn";
pub const ENV_LOG_JSON: &str = "RELAY_LOG_JSON";

/// Install the global subscriber. `RUST_LOG` wins over the default filter;
/// `RELAY_LOG_JSON=1` switches from compact lines to JSON.
/// Safe to call twice (the second call is a no-op).
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let json = std::env::var(ENV_LOG_JSON).is_ok_and(|v| v == "1");
    let (json_layer, compact_layer) = if json {
        (Some(fmt::layer().json().with_current_span(false)), None)
    } else {
        (None, Some(fmt::layer().compact().with_target(false)))
    };

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(compact_layer)
        .try_init();
}
