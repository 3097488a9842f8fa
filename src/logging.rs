//! Logging setup for the command-line binary
//!
//! The library only emits `tracing` events; installing a subscriber is the
//! binary's job. Filter precedence:
//! 1. `RUST_LOG`
//! 2. the filter passed in (from `--verbose` or `logLevel` in the config)
//! 3. `warn`

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "warn";

/// Build the filter for the given configured value
pub fn env_filter(filter: Option<&str>) -> EnvFilter {
    if std::env::var_os("RUST_LOG").is_some() {
        return EnvFilter::from_default_env();
    }
    EnvFilter::try_new(filter.unwrap_or(DEFAULT_FILTER))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber, writing to stderr
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_logging(filter: Option<&str>) {
    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::env::var_os("NO_COLOR").is_none()),
        )
        .with(env_filter(filter))
        .try_init();
}
