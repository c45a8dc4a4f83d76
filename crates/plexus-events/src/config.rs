//! Bus construction options.

/// Channel used when a caller names none.
pub const DEFAULT_CHANNEL: &str = "default";

/// Instance-level options for a [`PubSubBus`](crate::PubSubBus).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusConfig {
    /// Name of the bus instance, used in diagnostics.
    pub name: String,
    /// Channel used when `subscribe`/`publish` are given no channel.
    pub default_channel: String,
}

impl BusConfig {
    /// Create a configuration with the given instance name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the default channel. An empty name keeps [`DEFAULT_CHANNEL`].
    #[must_use]
    pub fn with_default_channel(mut self, channel: impl Into<String>) -> Self {
        let channel = channel.into();
        self.default_channel = if channel.is_empty() {
            DEFAULT_CHANNEL.to_string()
        } else {
            channel
        };
        self
    }
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            name: "bus".to_string(),
            default_channel: DEFAULT_CHANNEL.to_string(),
        }
    }
}

#[cfg(feature = "config")]
impl From<&plexus_config::BusSection> for BusConfig {
    fn from(section: &plexus_config::BusSection) -> Self {
        Self::new(section.name.clone()).with_default_channel(section.default_channel.clone())
    }
}
