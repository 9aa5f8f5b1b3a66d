//! Diagnostic logging.
//!
//! stdout is the protocol channel, so all log output goes to stderr.

use tracing_subscriber::EnvFilter;

/// Default filter when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LEVEL: &str = "info";

/// Install the global subscriber.
///
/// An explicit `level` wins over `RUST_LOG`. An unparseable filter falls
/// back to [`DEFAULT_LEVEL`]. Calling this twice is harmless.
pub fn init(level: Option<&str>) {
    let filter = build_filter(level, std::env::var("RUST_LOG").ok().as_deref());

    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(filter)
        .try_init();
}

fn build_filter(level: Option<&str>, env: Option<&str>) -> EnvFilter {
    level
        .or(env)
        .filter(|directive| !directive.trim().is_empty())
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LEVEL))
}
