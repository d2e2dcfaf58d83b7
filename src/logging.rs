//! Logging setup for the demo binaries.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! the binary's decision. Log emission never influences control flow.

use tracing_subscriber::EnvFilter;

/// Installs a timestamped, leveled `fmt` subscriber.
///
/// `verbose` lowers the default level to DEBUG; `RUST_LOG` overrides both.
/// Calling this more than once is harmless.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
