//! Test fixtures for common values.

use std::sync::Once;

use plexus_core::BoxError;
use serde_json::{Value, json};
use thiserror::Error;

/// Error type returned by deliberately failing callbacks in tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TestError(pub String);

/// Create a boxed test error with the given message.
#[must_use]
pub fn test_error(message: impl Into<String>) -> BoxError {
    Box::new(TestError(message.into()))
}

/// The payload of the canonical `app/heartbeat` message.
#[must_use]
pub fn heartbeat_payload(tick: u64) -> Value {
    json!({ "t": tick })
}

static LOGGING: Once = Once::new();

/// Install a `tracing` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs anything.
/// Honours `RUST_LOG`, defaulting to `warn`.
pub fn init_test_logging() {
    LOGGING.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
