//! Plexus Core - Foundation types shared by the plexus coordination crates.
//!
//! This crate provides:
//! - The [`PlexusError`] taxonomy used by the queue, bus and store
//! - Boxed and shared error aliases for callback failures
//! - The [`PropertyPath`] type addressing entries in an observable store

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod error;
pub mod path;

pub use error::{BoxError, PlexusError, PlexusResult, SharedError};
pub use path::{IntoPropertyPath, PropertyPath};
