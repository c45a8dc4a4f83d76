//! Plexus Queue - Serialized asynchronous task queue.
//!
//! This crate provides:
//! - A FIFO [`TaskQueue`] drained one task at a time on a Tokio runtime
//! - Per-task fault isolation: failures and panics are routed to the task's
//!   error callback or logged, never propagated into the drain loop
//!
//! # Example
//!
//! ```rust
//! use plexus_queue::{Task, TaskQueue};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = TaskQueue::new();
//!
//! queue.enqueue(Task::new(|| {
//!     tracing::info!("running deferred work");
//!     Ok(())
//! }));
//!
//! // Nothing has run yet: the drain is scheduled, not executed inline.
//! assert_eq!(queue.len(), 1);
//!
//! queue.flush().await.unwrap();
//! assert!(queue.is_empty());
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod guard;
mod queue;
mod task;

pub use guard::{catch_panic, catch_panic_async};
pub use queue::{QueueStats, TaskQueue};
pub use task::{ErrorCallback, Task, TaskAction, TaskResult};
