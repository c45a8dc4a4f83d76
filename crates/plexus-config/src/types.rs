//! Configuration types for the plexus coordination layer.
//!
//! All types in this module are self-contained with no dependencies on other
//! internal plexus crates. Every struct implements [`Default`] with the same
//! values as the embedded `defaults.toml`, so a bare `[section]` header in
//! TOML produces a working configuration.

use serde::{Deserialize, Serialize};

/// Name used for the default bus channel when none is configured.
pub const DEFAULT_CHANNEL_NAME: &str = "default";

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Publish-subscribe bus naming and defaults.
    pub bus: BusSection,
    /// Observable store naming.
    pub store: StoreSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

/// Bus configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusSection {
    /// Instance name, attached to log records.
    pub name: String,
    /// Channel used when a caller omits one.
    pub default_channel: String,
}

impl Default for BusSection {
    fn default() -> Self {
        Self {
            name: "bus".to_owned(),
            default_channel: DEFAULT_CHANNEL_NAME.to_owned(),
        }
    }
}

/// Store configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Instance name, attached to log records.
    pub name: String,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            name: "store".to_owned(),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level filter (e.g. `info`, `debug`, `warn,plexus_events=trace`).
    pub level: String,
    /// Output format: `pretty`, `compact`, `json` or `full`.
    pub format: String,
    /// Additional `tracing` directives (e.g. `plexus_queue=trace`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
        }
    }
}
