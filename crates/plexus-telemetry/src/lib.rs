//! Plexus Telemetry - Logging setup for the plexus coordination layer.
//!
//! This crate provides:
//! - A [`LogConfig`] builder covering level, per-crate directives, format
//!   and output target
//! - [`setup_logging`], installing a global `tracing` subscriber with an
//!   `EnvFilter` and a fmt layer writing to stdout, stderr or a rolling file
//!
//! The queue, bus and store crates only emit `tracing` events; installing a
//! subscriber is left to the embedding application.
//!
//! # Example
//!
//! ```rust,no_run
//! use plexus_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), plexus_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("plexus_events=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
