//! Logging bootstrap for binaries and tests (reads RUST_LOG env var).

use log::LevelFilter;

/// Initializes env_logger with an Info default. Safe to call more than once;
/// later calls are no-ops.
pub fn init() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .try_init();
}
