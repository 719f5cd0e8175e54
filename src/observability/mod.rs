//! Metrics and tracing setup.
//!
//! Every module logs through `tracing`; installing a subscriber is left to
//! the embedding binary. With the `logging` feature, `init_tracing`
//! installs a formatted subscriber filtered by `RUST_LOG`.

mod metrics;

pub use metrics::{Counter, ExecutionMetrics, Gauge, Histogram, MetricsSnapshot};

/// Installs a global fmt subscriber honoring `RUST_LOG`, defaulting to
/// `default_directive` (e.g. `"task_agent=info"`).
///
/// Returns `false` when a global subscriber was already set.
#[cfg(feature = "logging")]
pub fn init_tracing(default_directive: &str) -> bool {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
