//! Subscription handles, options and the per-message registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::bus::Handler;

/// Identifier of a subscription, unique within one bus.
///
/// Identifiers are drawn from a per-bus counter starting at 1 and display
/// as `sub_<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub(crate) fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The numeric value of the identifier.
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub_{}", self.0)
    }
}

/// Handle returned by `subscribe`, used to unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    channel: String,
    message: String,
    id: SubscriptionId,
}

impl Subscription {
    pub(crate) fn new(channel: String, message: String, id: SubscriptionId) -> Self {
        Self {
            channel,
            message,
            id,
        }
    }

    /// The channel the subscription was registered on.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The message name the subscription listens for.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The subscription identifier.
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// Options accepted by [`PubSubBus::subscribe_with`](crate::PubSubBus::subscribe_with).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeOptions {
    /// Remove the subscription after its first notification.
    #[serde(default)]
    pub once: bool,
}

impl SubscribeOptions {
    /// Options for a one-time subscription.
    #[must_use]
    pub fn once() -> Self {
        Self { once: true }
    }
}

/// Options accepted by [`PubSubBus::publish_async`](crate::PubSubBus::publish_async).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOptions {
    /// Kept for callers that distinguish "nobody listened" explicitly. A
    /// publish that reaches no subscriber resolves to an empty outcome list
    /// whether or not this is set.
    #[serde(default)]
    pub propagate: bool,
}

pub(crate) struct SubscriptionRecord {
    pub(crate) id: SubscriptionId,
    pub(crate) handler: Handler,
    pub(crate) once: bool,
}

/// Subscribers of one `(channel, message)` pair.
///
/// `order` holds notification order; `by_id` owns the records.
#[derive(Default)]
pub(crate) struct MessageRegistration {
    order: Vec<SubscriptionId>,
    by_id: HashMap<SubscriptionId, Arc<SubscriptionRecord>>,
}

impl MessageRegistration {
    pub(crate) fn push(&mut self, record: SubscriptionRecord) {
        self.order.push(record.id);
        self.by_id.insert(record.id, Arc::new(record));
    }

    pub(crate) fn remove(&mut self, id: SubscriptionId) -> bool {
        if self.by_id.remove(&id).is_none() {
            return false;
        }
        self.order.retain(|existing| *existing != id);
        true
    }

    /// Current subscribers in registration order. One-time subscribers are
    /// removed as part of taking the snapshot.
    pub(crate) fn snapshot(&mut self) -> Vec<Arc<SubscriptionRecord>> {
        let snapshot: Vec<_> = self
            .order
            .iter()
            .filter_map(|id| self.by_id.get(id).cloned())
            .collect();

        if snapshot.iter().any(|record| record.once) {
            for record in snapshot.iter().filter(|record| record.once) {
                self.by_id.remove(&record.id);
            }
            let by_id = &self.by_id;
            self.order.retain(|id| by_id.contains_key(id));
        }

        snapshot
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }
}
