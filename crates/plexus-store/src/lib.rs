//! Plexus Store - Path-addressed observable state.
//!
//! This crate provides:
//! - [`ObservableStore`], mapping [`PropertyPath`](plexus_core::PropertyPath)s
//!   to value-or-error entries with synchronous reads and writes
//! - Persistent and one-time [`Listener`]s, notified through a shared
//!   [`TaskQueue`](plexus_queue::TaskQueue)
//! - [`ObservableStore::wait_for`], a future resolving on the first value
//!   with an optional timeout
//! - [`Props`], a nested JSON property bag addressed by the same paths
//!
//! # Example
//!
//! ```rust
//! use plexus_queue::TaskQueue;
//! use plexus_store::ObservableStore;
//! use serde_json::json;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store: ObservableStore = ObservableStore::new(TaskQueue::new());
//!
//! let user = store.wait_for("session.user", Some(Duration::from_secs(1)));
//! store.set("session.user", json!("alice")).unwrap();
//!
//! assert_eq!(user.await.unwrap(), json!("alice"));
//! assert_eq!(store.get_or("session.theme", json!("light")), json!("light"));
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod config;
mod entry;
mod listener;
mod props;
mod store;

pub use config::StoreConfig;
pub use entry::{EntryState, EntryStatus, PropertyEntry};
pub use listener::{ErrorFn, Listener, ListenerResult, ValueFn};
pub use props::Props;
pub use store::ObservableStore;
