//! Tracing subscriber setup for rinkaku.
//!
//! One call at the composition root wires `RUST_LOG`-filtered, stderr-bound
//! structured logging for every crate in the workspace:
//!
//! ```no_run
//! rinkaku_telemetry::init();
//! ```
//!
//! Libraries themselves only ever emit through `tracing` macros and never
//! install subscribers.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber: `RUST_LOG` filter (default `info`) plus a
/// compact stderr layer.
///
/// Panics if a global subscriber is already set; use [`try_init`] where that
/// is not a programming error (tests, embedders).
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// Like [`init`], but ignore an already-installed subscriber.
pub fn try_init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_try_init_is_idempotent() {
        super::try_init();
        super::try_init();
        tracing::info!("still alive");
    }
}
