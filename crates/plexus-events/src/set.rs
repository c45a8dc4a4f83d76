//! Grouped subscriptions released together.

use std::future::Future;

use plexus_core::PlexusResult;
use serde_json::Value;
use tracing::debug;

use crate::bus::{HandlerResult, PubSubBus};
use crate::subscription::{SubscribeOptions, Subscription};

/// Subscriptions made on behalf of one component, released together.
///
/// A widget records every subscription it makes through its set and calls
/// [`release`](Self::release) when it stops. Dropping the set releases
/// whatever is still recorded.
#[derive(Debug)]
pub struct SubscriptionSet {
    bus: PubSubBus,
    handles: Vec<Subscription>,
}

impl SubscriptionSet {
    /// Create an empty set bound to `bus`.
    #[must_use]
    pub fn new(bus: PubSubBus) -> Self {
        Self {
            bus,
            handles: Vec::new(),
        }
    }

    /// Subscribe through the bus and record the handle.
    ///
    /// # Errors
    ///
    /// Returns the bus's error if `message` is empty.
    pub fn subscribe<F>(
        &mut self,
        channel: Option<&str>,
        message: &str,
        handler: F,
    ) -> PlexusResult<Subscription>
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe_with(channel, message, handler, SubscribeOptions::default())
    }

    /// Subscribe for a single notification and record the handle.
    ///
    /// # Errors
    ///
    /// Returns the bus's error if `message` is empty.
    pub fn subscribe_once<F>(
        &mut self,
        channel: Option<&str>,
        message: &str,
        handler: F,
    ) -> PlexusResult<Subscription>
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe_with(channel, message, handler, SubscribeOptions::once())
    }

    /// Subscribe with explicit options and record the handle.
    ///
    /// # Errors
    ///
    /// Returns the bus's error if `message` is empty.
    pub fn subscribe_with<F>(
        &mut self,
        channel: Option<&str>,
        message: &str,
        handler: F,
        options: SubscribeOptions,
    ) -> PlexusResult<Subscription>
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        let subscription = self
            .bus
            .subscribe_with(channel, message, handler, options)?;
        self.handles.push(subscription.clone());
        Ok(subscription)
    }

    /// Subscribe an asynchronous handler and record the handle.
    ///
    /// # Errors
    ///
    /// Returns the bus's error if `message` is empty.
    pub fn subscribe_async<F, Fut>(
        &mut self,
        channel: Option<&str>,
        message: &str,
        handler: F,
    ) -> PlexusResult<Subscription>
    where
        F: Fn(&Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let subscription = self.bus.subscribe_async(channel, message, handler)?;
        self.handles.push(subscription.clone());
        Ok(subscription)
    }

    /// Record a subscription made directly on the bus.
    pub fn add(&mut self, subscription: Subscription) {
        self.handles.push(subscription);
    }

    /// Number of recorded handles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether no handles are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Unsubscribe every recorded handle.
    ///
    /// Returns how many of them were still registered. One-time
    /// subscriptions that already fired count as gone.
    pub fn release(&mut self) -> usize {
        let total = self.handles.len();
        let live = self
            .handles
            .drain(..)
            .filter(|subscription| self.bus.unsubscribe(subscription))
            .count();
        if total > 0 {
            debug!(
                bus = %self.bus.config().name,
                released = live,
                recorded = total,
                "Subscription set released"
            );
        }
        live
    }
}

impl Drop for SubscriptionSet {
    fn drop(&mut self) {
        self.release();
    }
}
