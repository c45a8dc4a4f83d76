//! Plexus Test - Shared test utilities for the plexus crates.
//!
//! This crate provides recorders and fixtures that can be used across the
//! plexus crates as a dev-dependency.
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! plexus-test.workspace = true
//! ```
//!
//! Then record callback invocations in your tests:
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn test_handler_runs() {
//!     let calls = CallRecorder::new();
//!     let sink = calls.clone();
//!     bus.subscribe(Some("app"), "heartbeat", move |data| {
//!         sink.record(data.clone());
//!         Ok(Value::Null)
//!     })?;
//!
//!     bus.publish(Some("app"), "heartbeat", json!({"t": 1}));
//!     assert!(calls.wait_for_len(1, Duration::from_secs(1)).await);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod recorder;

pub use fixtures::*;
pub use recorder::*;
