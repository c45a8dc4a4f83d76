//! Prelude module - commonly used types for convenient import.
//!
//! Use `use plexus_events::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use plexus_events::prelude::*;
//! use plexus_queue::TaskQueue;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = PubSubBus::new(TaskQueue::new());
//! let outcomes = bus
//!     .publish_async(None, "nobody-listens", serde_json::Value::Null, PublishOptions::default())
//!     .await;
//! assert!(outcomes.is_empty());
//! # }
//! ```

// Bus
pub use crate::{AsyncMessageHandler, HandlerResult, MessageHandler, PubSubBus, WeakPubSubBus};

// Subscriptions
pub use crate::{PublishOptions, SubscribeOptions, Subscription, SubscriptionId, SubscriptionSet};

// Outcomes and configuration
pub use crate::{BusConfig, DEFAULT_CHANNEL, Settled};
