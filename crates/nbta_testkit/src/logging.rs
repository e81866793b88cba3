//! Tracing setup for tests.

use tracing_subscriber::{fmt, EnvFilter};

/// Installs a test-friendly fmt subscriber filtered by `RUST_LOG`
/// (default `info`).
///
/// Safe to call multiple times.
pub fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_test_writer()
        .try_init();
}
