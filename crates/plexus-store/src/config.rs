//! Store construction options.

/// Instance-level options for an [`ObservableStore`](crate::ObservableStore).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Name of the store instance, used in diagnostics.
    pub name: String,
}

impl StoreConfig {
    /// Create a configuration with the given instance name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("store")
    }
}

#[cfg(feature = "config")]
impl From<&plexus_config::StoreSection> for StoreConfig {
    fn from(section: &plexus_config::StoreSection) -> Self {
        Self::new(section.name.clone())
    }
}
