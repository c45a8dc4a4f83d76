//! Prelude module - commonly used types for convenient import.
//!
//! Use `use plexus_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{BoxError, PlexusError, PlexusResult, SharedError};

// Paths
pub use crate::{IntoPropertyPath, PropertyPath};
