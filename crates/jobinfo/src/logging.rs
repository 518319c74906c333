//! Diagnostic logging on stderr.
//!
//! The report owns stdout, so log lines never mix into it. `RUST_LOG`
//! overrides the level chosen from `--debug`.

use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn default_filter(debug: bool) -> EnvFilter {
    let level = if debug { Level::DEBUG } else { Level::WARN };
    EnvFilter::new(level.as_str().to_lowercase())
}

pub fn init(debug: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(debug));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(debug)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false),
        )
        .init();
}
