//! Stderr diagnostics.
//!
//! `RUST_LOG` wins when set; otherwise `[logging] level` from the config
//! decides. Calling [`init`] more than once is harmless.

use tracing_subscriber::EnvFilter;

use crate::config::schema::LoggingConfig;

/// Install the global `tracing` subscriber.
pub fn init(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(&config.level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Build a filter for a configured level, falling back to `warn` for
/// anything unparseable.
fn filter_for(level: &str) -> EnvFilter {
    let directive = format!("sentinel_dash={}", level.trim().to_ascii_lowercase());
    EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new("sentinel_dash=warn"))
}
