//! Structured logging setup for the daemon.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Level selected by `-v`/`-q` flags.
pub fn level_for(verbosity: u8, quiet: bool) -> Level {
    match (quiet, verbosity) {
        (true, _) => Level::WARN,
        (false, 0) => Level::INFO,
        (false, 1) => Level::DEBUG,
        (false, _) => Level::TRACE,
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over the flag-derived level. Calling this twice
/// is harmless; the second subscriber is dropped.
pub fn init(verbosity: u8, quiet: bool) {
    let level = level_for(verbosity, quiet);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,radiometer={}", level)));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_target(false).try_init();
}
