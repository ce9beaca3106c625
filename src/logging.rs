//! tracing subscriber setup

use std::sync::Once;

use tracing_subscriber::EnvFilter;

static INIT: Once = Once::new();

/// Install the global subscriber once. Logs go to stderr so `--json`
/// output on stdout stays machine-readable.
///
/// `level` is an `EnvFilter` directive; an invalid one falls back to `warn`.
pub fn init(level: &str, json: bool) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

        if json {
            let _ = tracing_subscriber::fmt()
                .json()
                .with_target(true)
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        } else {
            let _ = tracing_subscriber::fmt()
                .with_target(false)
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }

        tracing::debug!(log_level = %level, json, "logging initialized");
    });
}
