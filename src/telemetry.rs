//! Log output for test runs
//!
//! `#[kubetest::test]` calls [`init_logging`] before building its context,
//! so namespace creation, waits and teardown show up next to the test that
//! caused them. Output goes through libtest's capture: it is printed only
//! for failing tests, or for every test with `--nocapture`.
//!
//! Verbosity follows `RUST_LOG`. Without it, kubetest reports lifecycle
//! steps and problems but not individual polls:
//!
//! ```text
//! RUST_LOG=kubetest=debug cargo test -- --nocapture
//! ```

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info";

/// Route `tracing` events to the test output
///
/// Every test in a binary calls this; whichever runs first installs the
/// subscriber and the rest are no-ops.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging();
        init_logging();
        tracing::info!(namespace = "kubetest-test", "logging initialized");
    }
}
