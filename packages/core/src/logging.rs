//! Tracing setup for embedders and tests
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is left to the binary. `init_tracing` is the stock choice.

use tracing_subscriber::EnvFilter;

/// Install a formatted subscriber filtered by `RUST_LOG` (default `info`).
///
/// Safe to call more than once; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
