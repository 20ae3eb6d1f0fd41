// Logging bootstrap for the server binary

use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "info,lansia_core=info,lansia_server=info,tower_http=info";

/// Install the global fmt subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // A second init (tests, embedding) keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
