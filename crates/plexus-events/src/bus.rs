//! Publish-subscribe bus keyed by channel and message name.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use plexus_core::{BoxError, PlexusError, PlexusResult};
use plexus_queue::{Task, TaskQueue, catch_panic, catch_panic_async};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::config::BusConfig;
use crate::set::SubscriptionSet;
use crate::settled::Settled;
use crate::subscription::{
    MessageRegistration, PublishOptions, SubscribeOptions, Subscription, SubscriptionId,
    SubscriptionRecord,
};

/// Value returned by a message handler: a reply for
/// [`PubSubBus::publish_async`] or the handler's failure.
pub type HandlerResult = Result<Value, BoxError>;

/// A registered message handler.
pub type MessageHandler = Arc<dyn Fn(&Value) -> HandlerResult + Send + Sync + 'static>;

/// A registered handler whose reply is produced asynchronously.
pub type AsyncMessageHandler =
    Arc<dyn Fn(&Value) -> BoxFuture<'static, HandlerResult> + Send + Sync + 'static>;

/// How a subscription produces its reply.
pub(crate) enum Handler {
    Sync(MessageHandler),
    Async(AsyncMessageHandler),
}

/// A handler invocation once its queued task has started it.
enum Started {
    Ready(PlexusResult<Value>),
    Pending(BoxFuture<'static, PlexusResult<Value>>),
}

type Channels = HashMap<String, HashMap<String, MessageRegistration>>;

/// Channel/message publish-subscribe bus.
///
/// Every notification runs as a task on the bus's [`TaskQueue`]: a publish
/// returns before any handler runs, handlers for one topic run in
/// registration order, and a failing handler is isolated from its siblings
/// and from the publisher.
///
/// Cloning a `PubSubBus` creates a new handle to the same registry.
///
/// **WARNING:** A handler that captures a clone of the bus it is registered
/// on forms an `Arc` reference cycle, keeping the bus alive until the
/// handler is unsubscribed. Capture a [`WeakPubSubBus`] from
/// [`PubSubBus::downgrade`] instead when a handler needs to publish.
#[derive(Clone)]
pub struct PubSubBus {
    inner: Arc<BusInner>,
}

struct BusInner {
    config: BusConfig,
    queue: TaskQueue,
    channels: Mutex<Channels>,
    next_id: AtomicU64,
}

/// Non-owning handle to a [`PubSubBus`].
#[derive(Clone)]
pub struct WeakPubSubBus {
    inner: Weak<BusInner>,
}

impl WeakPubSubBus {
    /// Recover a bus handle, if the bus is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<PubSubBus> {
        self.inner.upgrade().map(|inner| PubSubBus { inner })
    }
}

impl fmt::Debug for WeakPubSubBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPubSubBus")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl PubSubBus {
    /// Create a bus with default configuration that dispatches on `queue`.
    #[must_use]
    pub fn new(queue: TaskQueue) -> Self {
        Self::with_config(queue, BusConfig::default())
    }

    /// Create a bus with explicit configuration.
    #[must_use]
    pub fn with_config(queue: TaskQueue, config: BusConfig) -> Self {
        debug!(
            bus = %config.name,
            default_channel = %config.default_channel,
            "Bus created"
        );
        Self {
            inner: Arc::new(BusInner {
                config,
                queue,
                channels: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// The bus configuration.
    #[must_use]
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// The queue notifications are dispatched on.
    #[must_use]
    pub fn queue(&self) -> &TaskQueue {
        &self.inner.queue
    }

    /// Create a non-owning handle to this bus.
    #[must_use]
    pub fn downgrade(&self) -> WeakPubSubBus {
        WeakPubSubBus {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Create an empty [`SubscriptionSet`] bound to this bus.
    #[must_use]
    pub fn subscription_set(&self) -> SubscriptionSet {
        SubscriptionSet::new(self.clone())
    }

    /// Subscribe `handler` to `message` on `channel`.
    ///
    /// `None` or an empty channel selects the configured default channel.
    /// The handler is appended after any existing subscribers of the topic.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if `message` is empty.
    pub fn subscribe<F>(
        &self,
        channel: Option<&str>,
        message: &str,
        handler: F,
    ) -> PlexusResult<Subscription>
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe_with(channel, message, handler, SubscribeOptions::default())
    }

    /// Subscribe `handler` for a single notification.
    ///
    /// The subscription is removed when the first publish reaching it takes
    /// its snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if `message` is empty.
    pub fn subscribe_once<F>(
        &self,
        channel: Option<&str>,
        message: &str,
        handler: F,
    ) -> PlexusResult<Subscription>
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe_with(channel, message, handler, SubscribeOptions::once())
    }

    /// Subscribe `handler` with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if `message` is empty.
    pub fn subscribe_with<F>(
        &self,
        channel: Option<&str>,
        message: &str,
        handler: F,
        options: SubscribeOptions,
    ) -> PlexusResult<Subscription>
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        self.register(channel, message, Handler::Sync(Arc::new(handler)), options)
    }

    /// Subscribe a handler that replies asynchronously.
    ///
    /// The queued task only starts the handler: the returned future is
    /// spawned on the queue's runtime, so the queue moves on while the reply
    /// is pending. A [`publish_async`](Self::publish_async) slot settles when
    /// the future completes.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if `message` is empty.
    pub fn subscribe_async<F, Fut>(
        &self,
        channel: Option<&str>,
        message: &str,
        handler: F,
    ) -> PlexusResult<Subscription>
    where
        F: Fn(&Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.subscribe_async_with(channel, message, handler, SubscribeOptions::default())
    }

    /// Subscribe an asynchronous handler with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if `message` is empty.
    pub fn subscribe_async_with<F, Fut>(
        &self,
        channel: Option<&str>,
        message: &str,
        handler: F,
        options: SubscribeOptions,
    ) -> PlexusResult<Subscription>
    where
        F: Fn(&Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: AsyncMessageHandler = Arc::new(move |data: &Value| handler(data).boxed());
        self.register(channel, message, Handler::Async(handler), options)
    }

    fn register(
        &self,
        channel: Option<&str>,
        message: &str,
        handler: Handler,
        options: SubscribeOptions,
    ) -> PlexusResult<Subscription> {
        if message.is_empty() {
            return Err(PlexusError::Usage(
                "message is required for a subscription".to_string(),
            ));
        }
        let channel = self.resolve_channel(channel);
        let id = self.next_id();

        self.inner
            .channels()
            .entry(channel.to_string())
            .or_default()
            .entry(message.to_string())
            .or_default()
            .push(SubscriptionRecord {
                id,
                handler,
                once: options.once,
            });

        trace!(
            bus = %self.inner.config.name,
            channel,
            message,
            subscription = %id,
            once = options.once,
            "Subscribed"
        );
        Ok(Subscription::new(channel.to_string(), message.to_string(), id))
    }

    /// Remove a subscription.
    ///
    /// Returns `false` if the channel, the message or the subscription no
    /// longer exists. Tasks already enqueued for the subscription still run.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        let removed = self
            .inner
            .channels()
            .get_mut(subscription.channel())
            .and_then(|messages| messages.get_mut(subscription.message()))
            .is_some_and(|registration| registration.remove(subscription.id()));

        trace!(
            channel = subscription.channel(),
            message = subscription.message(),
            subscription = %subscription.id(),
            removed,
            "Unsubscribed"
        );
        removed
    }

    /// Publish `data` to every current subscriber of `message` on `channel`.
    ///
    /// One task per subscriber is enqueued; none runs before this call
    /// returns. A handler failure is wrapped into
    /// [`PlexusError::Handler`] and reported on the queue's diagnostic path,
    /// never to the publisher. An asynchronous handler that fails after its
    /// task has finished is logged at `warn`. Publishing to a topic with no
    /// subscribers is a no-op.
    ///
    /// Returns the number of subscribers notified.
    pub fn publish(&self, channel: Option<&str>, message: &str, data: Value) -> usize {
        let channel = self.resolve_channel(channel);
        let snapshot = self.snapshot(channel, message);
        if snapshot.is_empty() {
            trace!(channel, message, "No subscribers for message");
            return 0;
        }

        let count = snapshot.len();
        let data = Arc::new(data);
        for record in snapshot {
            let data = Arc::clone(&data);
            let channel_name = channel.to_string();
            let message_name = message.to_string();
            let label = format!("{channel}:{message}:{}", record.id);
            let handle = self.inner.queue.handle().clone();
            self.inner.queue.enqueue(
                Task::new(move || {
                    let started = start(&channel_name, &message_name, &record, &data);
                    match started {
                        Started::Ready(outcome) => outcome.map(|_| ()),
                        Started::Pending(reply) => {
                            drop(handle.spawn(async move {
                                if let Err(err) = reply.await {
                                    warn!(
                                        channel = %channel_name,
                                        message = %message_name,
                                        error = %err,
                                        "Asynchronous handler failed"
                                    );
                                }
                            }));
                            Ok(())
                        },
                    }
                })
                .with_label(label),
            );
        }

        debug!(channel, message, subscribers = count, "Message published");
        count
    }

    /// Publish `data` and collect the outcome of every subscriber.
    ///
    /// The snapshot is taken and the tasks are enqueued when this is called;
    /// the returned future only aggregates. Outcomes are in subscriber order
    /// and a failing handler rejects only its own slot. A topic with no
    /// subscribers resolves to an empty list.
    pub fn publish_async(
        &self,
        channel: Option<&str>,
        message: &str,
        data: Value,
        options: PublishOptions,
    ) -> impl Future<Output = Vec<Settled>> + Send + 'static {
        let channel = self.resolve_channel(channel);
        let snapshot = self.snapshot(channel, message);
        if snapshot.is_empty() {
            trace!(
                channel,
                message,
                propagate = options.propagate,
                "No subscribers for message"
            );
        }

        let data = Arc::new(data);
        let receivers: Vec<_> = snapshot
            .into_iter()
            .map(|record| {
                let (tx, rx) = oneshot::channel();
                let data = Arc::clone(&data);
                let channel_name = channel.to_string();
                let message_name = message.to_string();
                let label = format!("{channel}:{message}:{}", record.id);
                let handle = self.inner.queue.handle().clone();
                self.inner.queue.enqueue(
                    Task::new(move || {
                        let started = start(&channel_name, &message_name, &record, &data);
                        match started {
                            Started::Ready(outcome) => {
                                let _ = tx.send(Settled::from(outcome));
                            },
                            Started::Pending(reply) => {
                                drop(handle.spawn(async move {
                                    let _ = tx.send(Settled::from(reply.await));
                                }));
                            },
                        }
                        Ok(())
                    })
                    .with_label(label),
                );
                rx
            })
            .collect();

        async move {
            join_all(receivers)
                .await
                .into_iter()
                .map(|received| {
                    received.unwrap_or_else(|_| Settled::Rejected(PlexusError::QueueClosed))
                })
                .collect()
        }
    }

    /// Number of current subscribers of `message` on `channel`.
    #[must_use]
    pub fn subscriber_count(&self, channel: Option<&str>, message: &str) -> usize {
        let channel = self.resolve_channel(channel);
        self.inner
            .channels()
            .get(channel)
            .and_then(|messages| messages.get(message))
            .map_or(0, MessageRegistration::len)
    }

    /// Number of channels created so far.
    ///
    /// Channels are created by their first subscription and never pruned.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.inner.channels().len()
    }

    fn resolve_channel<'a>(&'a self, channel: Option<&'a str>) -> &'a str {
        match channel {
            Some(name) if !name.is_empty() => name,
            _ => &self.inner.config.default_channel,
        }
    }

    fn next_id(&self) -> SubscriptionId {
        let raw = self
            .inner
            .next_id
            .fetch_add(1, Ordering::Relaxed)
            .wrapping_add(1);
        SubscriptionId::new(raw)
    }

    fn snapshot(&self, channel: &str, message: &str) -> Vec<Arc<SubscriptionRecord>> {
        self.inner
            .channels()
            .get_mut(channel)
            .and_then(|messages| messages.get_mut(message))
            .map(MessageRegistration::snapshot)
            .unwrap_or_default()
    }
}

impl fmt::Debug for PubSubBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PubSubBus")
            .field("name", &self.inner.config.name)
            .field("default_channel", &self.inner.config.default_channel)
            .field("channels", &self.channel_count())
            .finish_non_exhaustive()
    }
}

impl BusInner {
    fn channels(&self) -> MutexGuard<'_, Channels> {
        self.channels.lock().unwrap_or_else(|e| {
            warn!("Bus registry lock poisoned, recovering");
            e.into_inner()
        })
    }
}

/// Run one handler, or start it if it replies asynchronously.
///
/// Errors and panics, including panics while polling an asynchronous reply,
/// are wrapped into [`PlexusError::Handler`].
fn start(channel: &str, message: &str, record: &SubscriptionRecord, data: &Value) -> Started {
    let id = record.id.get();
    match &record.handler {
        Handler::Sync(handler) => {
            let outcome = catch_panic(|| {
                handler(data).map_err(|e| PlexusError::handler(channel, message, id, e))
            });
            Started::Ready(settle(channel, message, id, outcome))
        },
        Handler::Async(handler) => match catch_panic(|| Ok(handler(data))) {
            Err(panic) => Started::Ready(settle(channel, message, id, Err(panic))),
            Ok(reply) => {
                let channel = channel.to_string();
                let message = message.to_string();
                Started::Pending(
                    async move {
                        let outcome = catch_panic_async(async {
                            reply
                                .await
                                .map_err(|e| PlexusError::handler(&channel, &message, id, e))
                        })
                        .await;
                        settle(&channel, &message, id, outcome)
                    }
                    .boxed(),
                )
            },
        },
    }
}

fn settle(
    channel: &str,
    message: &str,
    subscription: u64,
    outcome: PlexusResult<Value>,
) -> PlexusResult<Value> {
    let outcome = match outcome {
        Err(panic @ PlexusError::Panicked(_)) => Err(PlexusError::Handler {
            channel: channel.to_string(),
            message: message.to_string(),
            subscription,
            source: Arc::new(panic),
        }),
        other => other,
    };

    if let Err(err) = &outcome {
        debug!(
            channel,
            message,
            subscription,
            error = %err,
            "Message handler failed"
        );
    }
    outcome
}
