//! Plexus Events - Channel/message publish-subscribe bus.
//!
//! This crate provides:
//! - [`PubSubBus`], keyed by channel and message name, dispatching every
//!   publish through a shared [`TaskQueue`](plexus_queue::TaskQueue)
//! - Fire-and-forget [`PubSubBus::publish`] and the aggregating
//!   [`PubSubBus::publish_async`], whose slots are [`Settled`] outcomes
//! - [`SubscriptionSet`] for releasing every subscription a component made
//!
//! # Architecture
//!
//! Subscribers are registered per `(channel, message)` in insertion order.
//! A publish snapshots the current subscribers and enqueues one task per
//! subscriber, so handlers never run inside the publisher's stack frame and
//! a failing handler cannot affect its siblings.
//!
//! # Example
//!
//! ```rust
//! use plexus_events::PubSubBus;
//! use plexus_queue::TaskQueue;
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let bus = PubSubBus::new(TaskQueue::new());
//!
//! bus.subscribe(Some("app"), "heartbeat", |data| {
//!     tracing::info!(tick = %data["t"], "heartbeat");
//!     Ok(serde_json::Value::Null)
//! })
//! .unwrap();
//!
//! assert_eq!(bus.publish(Some("app"), "heartbeat", json!({ "t": 1 })), 1);
//! bus.queue().flush().await.unwrap();
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod bus;
mod config;
mod set;
mod settled;
mod subscription;

pub use bus::{AsyncMessageHandler, HandlerResult, MessageHandler, PubSubBus, WeakPubSubBus};
pub use config::{BusConfig, DEFAULT_CHANNEL};
pub use set::SubscriptionSet;
pub use settled::Settled;
pub use subscription::{PublishOptions, SubscribeOptions, Subscription, SubscriptionId};
