#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
//! Unified configuration for the plexus coordination layer.
//!
//! This crate provides a single [`Config`] type covering the instance-level
//! naming of the bus and the store, the bus default channel, and logging.
//!
//! # Usage
//!
//! ```rust,no_run
//! use plexus_config::Config;
//!
//! // Load with full precedence chain (defaults → file → env fallbacks).
//! let resolved = Config::load(Some(std::path::Path::new("plexus.toml"))).unwrap();
//! println!("Default channel: {}", resolved.config.bus.default_channel);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **File** (the path passed to [`Config::load`])
//! 2. **Environment variables** (`PLEXUS_*`): fallback only, for fields
//!    the file did not set
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! # Design
//!
//! This crate has **no dependencies on other internal plexus crates**.
//! Conversion into component configuration (`BusConfig`, `StoreConfig`,
//! `LogConfig`) lives behind the `config` feature of those crates.

/// Configuration error types.
pub mod error;
/// Configuration file loading and environment fallbacks.
pub mod loader;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load configuration from embedded defaults, an optional file and the
    /// process environment.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is unreadable or malformed, or
    /// the final configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(path, &loader::collect_env_vars())
    }

    /// Parse a TOML document layered over the embedded defaults.
    ///
    /// Environment variables are not consulted.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the document is malformed or fails
    /// validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::from_toml_str(content)
    }
}
