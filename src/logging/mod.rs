//! Tracing initialization.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Honors `RUST_LOG`; defaults to `lazygram=info` when unset. Calling it
/// more than once is harmless - later calls are ignored.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lazygram=info"));

    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
