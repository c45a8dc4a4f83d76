//! Prelude module - commonly used types for convenient import.
//!
//! Use `use plexus_store::prelude::*;` to import all essential types.

// Store
pub use crate::{ObservableStore, StoreConfig};

// Listeners
pub use crate::{Listener, ListenerResult};

// Entries
pub use crate::{EntryState, EntryStatus, PropertyEntry};

// Property bag
pub use crate::Props;
