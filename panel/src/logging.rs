//! Tracing setup shared by the `panel` and `panel-ui` binaries.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "panel=info,panel_ui=info";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to info for the panel crates.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=panel=debug panel-ui --port 7001
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
