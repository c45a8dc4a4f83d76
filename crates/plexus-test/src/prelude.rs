//! Prelude module - commonly used test helpers.
//!
//! Use `use plexus_test::prelude::*;` in test modules.

pub use crate::{CallRecorder, TestError, heartbeat_payload, init_test_logging, test_error};
