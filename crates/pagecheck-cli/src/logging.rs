//! Tracing setup
//!
//! Logs go to stderr so `--format json` keeps stdout clean. `RUST_LOG`
//! overrides the level derived from `-q`/`-v`.

use crate::config::Verbosity;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Build the filter for a verbosity level, honouring `RUST_LOG`
#[must_use]
pub fn filter_for(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()))
}

/// Install the global subscriber
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing(verbosity: Verbosity, use_color: bool) {
    let _ = tracing_subscriber::registry()
        .with(filter_for(verbosity))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(use_color)
                .with_target(verbosity.is_debug())
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
