//! Structured logging setup.

use tracing_subscriber::EnvFilter;

/// Install a formatted `tracing` subscriber driven by `RUST_LOG`.
///
/// Falls back to `info` for this crate when the variable is unset. Does
/// nothing when the host application already installed a subscriber, so
/// library users keep control of their own telemetry.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("turnstile=info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
