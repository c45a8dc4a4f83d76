//! Prelude module - commonly used types for convenient import.
//!
//! Use `use plexus_queue::prelude::*;` to import all essential types.

pub use crate::{QueueStats, Task, TaskQueue, TaskResult, catch_panic, catch_panic_async};
