//! Path-addressed observable state store.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use plexus_core::{IntoPropertyPath, PlexusError, PlexusResult, PropertyPath, SharedError};
use plexus_queue::{Task, TaskQueue, catch_panic};
use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::config::StoreConfig;
use crate::entry::{EntryState, PropertyEntry};
use crate::listener::{Listener, ListenerResult};

type Listeners<V> = Vec<Arc<Listener<V>>>;
type WaiterSlot<V> = Arc<Mutex<Option<oneshot::Sender<PlexusResult<V>>>>>;

/// Mapping from property paths to value-or-error entries.
///
/// Reads and writes are synchronous. Listeners registered on a path are
/// notified through the store's [`TaskQueue`], never inside the setter's
/// stack frame, in registration order. A failing listener is logged and
/// isolated.
///
/// Cloning an `ObservableStore` creates a new handle to the same state.
pub struct ObservableStore<V = Value> {
    inner: Arc<StoreInner<V>>,
}

struct StoreInner<V> {
    config: StoreConfig,
    queue: TaskQueue,
    state: Mutex<StoreState<V>>,
}

struct StoreState<V> {
    entries: HashMap<PropertyPath, PropertyEntry<V>>,
    listeners: HashMap<PropertyPath, Listeners<V>>,
}

enum Waiter<V> {
    Ready(PlexusResult<V>),
    Pending(oneshot::Receiver<PlexusResult<V>>),
}

impl<V> StoreState<V> {
    /// Listeners on `path` in registration order. One-time listeners are
    /// removed as part of taking the snapshot.
    fn snapshot(&mut self, path: &PropertyPath) -> Listeners<V> {
        let Some(registered) = self.listeners.get_mut(path) else {
            return Vec::new();
        };
        let snapshot = registered.clone();
        registered.retain(|listener| !listener.once);
        snapshot
    }
}

impl<V> ObservableStore<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Create a store with default configuration that notifies on `queue`.
    #[must_use]
    pub fn new(queue: TaskQueue) -> Self {
        Self::with_config(queue, StoreConfig::default())
    }

    /// Create a store with explicit configuration.
    #[must_use]
    pub fn with_config(queue: TaskQueue, config: StoreConfig) -> Self {
        debug!(store = %config.name, "Store created");
        Self {
            inner: Arc::new(StoreInner {
                config,
                queue,
                state: Mutex::new(StoreState {
                    entries: HashMap::new(),
                    listeners: HashMap::new(),
                }),
            }),
        }
    }

    /// The store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// The queue listener notifications are dispatched on.
    #[must_use]
    pub fn queue(&self) -> &TaskQueue {
        &self.inner.queue
    }

    /// Replace the entry at `path` with `value` and notify its listeners.
    ///
    /// Each listener's on-value callback is queued with `(value, old)`.
    /// One-time listeners are consumed.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if `path` is not a valid path.
    pub fn set(&self, path: impl IntoPropertyPath, value: V) -> PlexusResult<&Self> {
        let path = path.into_property_path()?;
        self.store_value(&path, value);
        Ok(self)
    }

    /// Replace the value at `path` with `f(current)` and notify as
    /// [`set`](Self::set) does.
    ///
    /// `f` runs on the caller's stack without the store lock held.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] for an invalid path,
    /// [`PlexusError::NotFound`] if the path has no entry and
    /// [`PlexusError::Store`] if it holds an error. Nothing changes in
    /// either case.
    pub fn modify<F>(&self, path: impl IntoPropertyPath, f: F) -> PlexusResult<&Self>
    where
        F: FnOnce(&V) -> V,
    {
        let path = path.into_property_path()?;
        let current = match self.inner.lock().entries.get(&path).map(PropertyEntry::state) {
            Some(EntryState::Set(value)) => value.clone(),
            Some(EntryState::Error(error)) => {
                return Err(PlexusError::Store {
                    path: path.to_string(),
                    source: Arc::clone(error),
                });
            },
            None => {
                return Err(PlexusError::NotFound {
                    path: path.to_string(),
                });
            },
        };

        self.store_value(&path, f(&current));
        Ok(self)
    }

    /// Put `path` into the error state and notify its listeners' on-error
    /// callbacks.
    ///
    /// Listeners without an on-error callback are skipped, but one-time
    /// listeners are consumed either way.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if `path` is not a valid path.
    pub fn set_error(
        &self,
        path: impl IntoPropertyPath,
        error: impl Into<SharedError>,
    ) -> PlexusResult<&Self> {
        let path = path.into_property_path()?;
        let error: SharedError = error.into();

        let listeners = {
            let mut state = self.inner.lock();
            state
                .entries
                .insert(path.clone(), PropertyEntry::error(Arc::clone(&error)));
            state.snapshot(&path)
        };

        trace!(
            store = %self.inner.config.name,
            %path,
            error = %error,
            listeners = listeners.len(),
            "Property error set"
        );

        for listener in listeners {
            let Some(on_error) = listener.on_error.clone() else {
                continue;
            };
            let error = Arc::clone(&error);
            let path_name = path.to_string();
            self.inner.queue.enqueue(
                Task::new(move || guarded(&path_name, || on_error(&error)))
                    .with_label(format!("listener:{path}")),
            );
        }
        Ok(self)
    }

    /// The value at `path`, or `None` if it is absent, in the error state or
    /// not a valid path.
    #[must_use]
    pub fn get(&self, path: impl IntoPropertyPath) -> Option<V> {
        let path = path.into_property_path().ok()?;
        self.inner
            .lock()
            .entries
            .get(&path)
            .and_then(PropertyEntry::as_value)
            .cloned()
    }

    /// The value at `path`, or `default` if there is none.
    #[must_use]
    pub fn get_or(&self, path: impl IntoPropertyPath, default: V) -> V {
        self.get(path).unwrap_or(default)
    }

    /// Whether `path` has an entry, whatever its status.
    #[must_use]
    pub fn has(&self, path: impl IntoPropertyPath) -> bool {
        path.into_property_path()
            .is_ok_and(|path| self.inner.lock().entries.contains_key(&path))
    }

    /// Whether the entry at `path` is in the error state.
    #[must_use]
    pub fn has_error(&self, path: impl IntoPropertyPath) -> bool {
        self.error(path).is_some()
    }

    /// The error stored at `path`, if it is in the error state.
    #[must_use]
    pub fn error(&self, path: impl IntoPropertyPath) -> Option<SharedError> {
        let path = path.into_property_path().ok()?;
        self.inner
            .lock()
            .entries
            .get(&path)
            .and_then(PropertyEntry::as_error)
            .cloned()
    }

    /// A snapshot of the full entry at `path`.
    #[must_use]
    pub fn entry(&self, path: impl IntoPropertyPath) -> Option<PropertyEntry<V>> {
        let path = path.into_property_path().ok()?;
        self.inner.lock().entries.get(&path).cloned()
    }

    /// Remove the entry at `path`.
    ///
    /// Listeners stay registered and are not notified. Returns whether an
    /// entry was removed.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if `path` is not a valid path.
    pub fn delete(&self, path: impl IntoPropertyPath) -> PlexusResult<bool> {
        let path = path.into_property_path()?;
        let removed = self.inner.lock().entries.remove(&path).is_some();
        trace!(store = %self.inner.config.name, %path, removed, "Property deleted");
        Ok(removed)
    }

    /// Register `listener` on `path`.
    ///
    /// If the path already has an entry, the listener is notified
    /// immediately on the caller's stack with the current value (or error),
    /// and a one-time listener is then not retained. Otherwise, and for
    /// persistent listeners, the listener is appended for future
    /// notifications.
    ///
    /// A failing immediate notification is logged and does not fail the
    /// registration.
    ///
    /// The immediate notification precedes every queued one for sets made
    /// after `listen` returns. A persistent listener is visible to other
    /// setters before its immediate notification runs, so on a multi-thread
    /// runtime a `set` racing with `listen` from another thread may be
    /// delivered first.
    ///
    /// # Errors
    ///
    /// Returns [`PlexusError::Usage`] if `path` is not a valid path.
    pub fn listen(&self, path: impl IntoPropertyPath, listener: Listener<V>) -> PlexusResult<()> {
        let path = path.into_property_path()?;
        let listener = Arc::new(listener);

        let current = {
            let mut state = self.inner.lock();
            let current = state.entries.get(&path).cloned();
            if current.is_none() || !listener.once {
                state
                    .listeners
                    .entry(path.clone())
                    .or_default()
                    .push(Arc::clone(&listener));
            }
            current
        };

        trace!(
            store = %self.inner.config.name,
            %path,
            once = listener.once,
            immediate = current.is_some(),
            "Listener registered"
        );

        if let Some(entry) = current {
            let path_name = path.to_string();
            let outcome = match entry.state() {
                EntryState::Set(value) => guarded(&path_name, || (listener.on_value)(value, None)),
                EntryState::Error(error) => match &listener.on_error {
                    Some(on_error) => guarded(&path_name, || on_error(error)),
                    None => Ok(()),
                },
            };
            if let Err(err) = outcome {
                warn!(
                    store = %self.inner.config.name,
                    %path,
                    error = %err,
                    "Immediate listener notification failed"
                );
            }
        }
        Ok(())
    }

    /// Wait for the first value at `path`.
    ///
    /// Resolves immediately if the path already has an entry. Otherwise a
    /// one-time listener is registered when this is called, not when the
    /// future is first polled. With a `timeout`, the future rejects with
    /// [`PlexusError::Timeout`] if nothing is set in time; the listener is
    /// left registered in that case.
    ///
    /// # Errors
    ///
    /// Resolves to [`PlexusError::Usage`] for an invalid path,
    /// [`PlexusError::Store`] if the path is or becomes an error,
    /// [`PlexusError::Timeout`] on timeout and [`PlexusError::QueueClosed`]
    /// if the store is dropped first.
    pub fn wait_for(
        &self,
        path: impl IntoPropertyPath,
        timeout: Option<Duration>,
    ) -> impl Future<Output = PlexusResult<V>> + Send + 'static {
        let registration = path
            .into_property_path()
            .map(|path| self.register_waiter(path));

        async move {
            let (path, waiter) = registration?;
            let rx = match waiter {
                Waiter::Ready(result) => return result,
                Waiter::Pending(rx) => rx,
            };
            let received = match timeout {
                Some(limit) => tokio::time::timeout(limit, rx).await.map_err(|_| {
                    PlexusError::Timeout {
                        path: path.to_string(),
                        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    }
                })?,
                None => rx.await,
            };
            received.unwrap_or_else(|_| Err(PlexusError::QueueClosed))
        }
    }

    /// Number of listeners registered on `path`.
    #[must_use]
    pub fn listener_count(&self, path: impl IntoPropertyPath) -> usize {
        path.into_property_path().map_or(0, |path| {
            self.inner
                .lock()
                .listeners
                .get(&path)
                .map_or(0, Vec::len)
        })
    }

    /// Number of paths with an entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether no path has an entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    fn store_value(&self, path: &PropertyPath, value: V) {
        let (old, listeners) = {
            let mut state = self.inner.lock();
            let old = state
                .entries
                .insert(path.clone(), PropertyEntry::value(value.clone()))
                .and_then(PropertyEntry::into_value);
            (old, state.snapshot(path))
        };

        trace!(
            store = %self.inner.config.name,
            %path,
            listeners = listeners.len(),
            "Property set"
        );
        if listeners.is_empty() {
            return;
        }

        let value = Arc::new(value);
        let old = Arc::new(old);
        for listener in listeners {
            let value = Arc::clone(&value);
            let old = Arc::clone(&old);
            let path_name = path.to_string();
            self.inner.queue.enqueue(
                Task::new(move || {
                    guarded(&path_name, || (listener.on_value)(&value, (*old).as_ref()))
                })
                .with_label(format!("listener:{path}")),
            );
        }
    }

    fn register_waiter(&self, path: PropertyPath) -> (PropertyPath, Waiter<V>) {
        let mut state = self.inner.lock();
        if let Some(entry) = state.entries.get(&path) {
            let result = match entry.state() {
                EntryState::Set(value) => Ok(value.clone()),
                EntryState::Error(error) => Err(PlexusError::Store {
                    path: path.to_string(),
                    source: Arc::clone(error),
                }),
            };
            return (path, Waiter::Ready(result));
        }

        let (tx, rx) = oneshot::channel();
        let on_value_slot: WaiterSlot<V> = Arc::new(Mutex::new(Some(tx)));
        let on_error_slot = Arc::clone(&on_value_slot);
        let error_path = path.to_string();

        let listener = Listener::on_value(move |value: &V, _old: Option<&V>| {
            resolve(&on_value_slot, Ok(value.clone()));
            Ok(())
        })
        .with_on_error(move |error| {
            resolve(
                &on_error_slot,
                Err(PlexusError::Store {
                    path: error_path.clone(),
                    source: Arc::clone(error),
                }),
            );
            Ok(())
        })
        .once();

        state
            .listeners
            .entry(path.clone())
            .or_default()
            .push(Arc::new(listener));
        drop(state);

        trace!(store = %self.inner.config.name, %path, "Waiting for property");
        (path, Waiter::Pending(rx))
    }
}

impl<V> Clone for ObservableStore<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for ObservableStore<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("ObservableStore")
            .field("name", &self.inner.config.name)
            .field("entries", &state.entries.len())
            .field("listened_paths", &state.listeners.len())
            .finish_non_exhaustive()
    }
}

impl<V> StoreInner<V> {
    fn lock(&self) -> MutexGuard<'_, StoreState<V>> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("Store state lock poisoned, recovering");
            e.into_inner()
        })
    }
}

/// Run a listener callback, wrapping an error or a panic into
/// [`PlexusError::Listener`].
fn guarded(path: &str, f: impl FnOnce() -> ListenerResult) -> PlexusResult<()> {
    match catch_panic(|| f().map_err(|e| PlexusError::listener(path, e))) {
        Err(panic @ PlexusError::Panicked(_)) => Err(PlexusError::Listener {
            path: path.to_string(),
            source: Arc::new(panic),
        }),
        other => other,
    }
}

fn resolve<T>(slot: &Mutex<Option<oneshot::Sender<T>>>, outcome: T) {
    let sender = slot
        .lock()
        .unwrap_or_else(|e| {
            warn!("Waiter lock poisoned, recovering");
            e.into_inner()
        })
        .take();
    if let Some(sender) = sender {
        let _ = sender.send(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plexus_test::prelude::*;
    use serde_json::json;

    fn store() -> ObservableStore {
        ObservableStore::new(TaskQueue::new())
    }

    fn value_recorder(
        recorder: &CallRecorder<(Value, Option<Value>)>,
    ) -> Listener<Value> {
        let recorder = recorder.clone();
        Listener::on_value(move |value: &Value, old: Option<&Value>| {
            recorder.record((value.clone(), old.cloned()));
            Ok(())
        })
    }

    #[tokio::test]
    async fn test_get_and_default() {
        let store = store();
        assert_eq!(store.get("session.user"), None);
        assert_eq!(store.get_or("session.user", json!("anon")), json!("anon"));

        store.set("session.user", json!("alice")).unwrap();
        assert_eq!(store.get("session.user"), Some(json!("alice")));
        assert_eq!(store.get_or("session.user", json!("anon")), json!("alice"));
        assert!(store.has("session.user"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_error_state_reads_as_default() {
        let store = store();
        store.set("session.user", json!("alice")).unwrap();
        store
            .set_error("session.user", test_error("auth expired"))
            .unwrap();

        assert!(store.has_error("session.user"));
        assert!(store.has("session.user"));
        assert_eq!(store.get_or("session.user", json!("anon")), json!("anon"));
        assert_eq!(
            store.error("session.user").unwrap().to_string(),
            "auth expired"
        );
    }

    #[tokio::test]
    async fn test_set_supersedes_error() {
        let store = store();
        store.set_error("x", test_error("down")).unwrap();
        store.set("x", json!(1)).unwrap();
        assert!(!store.has_error("x"));
        assert_eq!(store.get("x"), Some(json!(1)));
    }

    #[tokio::test]
    async fn test_path_forms_address_same_entry() {
        let store = store();
        store.set(["widgets", "loaded"], json!(true)).unwrap();
        assert_eq!(store.get("widgets.loaded"), Some(json!(true)));
        assert_eq!(store.get("widgets/loaded"), Some(json!(true)));
    }

    #[tokio::test]
    async fn test_invalid_path() {
        let store = store();
        assert!(matches!(
            store.set("a..b", json!(1)),
            Err(PlexusError::Usage(_))
        ));
        assert!(store.get("").is_none());
        assert!(!store.has(""));
        assert!(store.delete("").is_err());
        assert!(matches!(
            store.wait_for("", None).await,
            Err(PlexusError::Usage(_))
        ));
    }

    #[tokio::test]
    async fn test_set_chains() {
        let store = store();
        store
            .set("a", json!(1))
            .unwrap()
            .set("b", json!(2))
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_persistent_and_one_time_listeners() {
        let store = store();
        let l1 = CallRecorder::new();
        let l2 = CallRecorder::new();
        store.listen("x", value_recorder(&l1)).unwrap();
        store.listen("x", value_recorder(&l2).once()).unwrap();

        store.set("x", json!(1)).unwrap();
        store.set("x", json!(2)).unwrap();
        store.queue().flush().await.unwrap();

        assert_eq!(
            l1.calls(),
            vec![(json!(1), None), (json!(2), Some(json!(1)))]
        );
        assert_eq!(l2.calls(), vec![(json!(1), None)]);
        assert_eq!(store.listener_count("x"), 1);
    }

    #[tokio::test]
    async fn test_notification_is_deferred() {
        let store = store();
        let calls = CallRecorder::new();
        store.listen("x", value_recorder(&calls)).unwrap();

        store.set("x", json!(1)).unwrap();
        assert!(calls.is_empty());
        store.queue().flush().await.unwrap();
        assert_eq!(calls.len(), 1);
    }

    #[tokio::test]
    async fn test_old_value_after_error_is_none() {
        let store = store();
        let calls = CallRecorder::new();
        store.set_error("x", test_error("down")).unwrap();
        store.listen("x", value_recorder(&calls)).unwrap();

        store.set("x", json!("up")).unwrap();
        store.queue().flush().await.unwrap();

        assert_eq!(calls.calls(), vec![(json!("up"), None)]);
    }

    #[tokio::test]
    async fn test_set_error_notifies_on_error_only() {
        let store = store();
        let values = CallRecorder::new();
        let errors: CallRecorder<String> = CallRecorder::new();
        {
            let errors = errors.clone();
            store
                .listen(
                    "x",
                    value_recorder(&values).with_on_error(move |err| {
                        errors.record(err.to_string());
                        Ok(())
                    }),
                )
                .unwrap();
        }
        let skipped = CallRecorder::new();
        store.listen("x", value_recorder(&skipped).once()).unwrap();

        store.set_error("x", test_error("boom")).unwrap();
        store.queue().flush().await.unwrap();

        assert!(values.is_empty());
        assert_eq!(errors.calls(), vec!["boom".to_string()]);
        // the one-time listener without on_error is consumed anyway
        assert!(skipped.is_empty());
        assert_eq!(store.listener_count("x"), 1);
    }

    #[tokio::test]
    async fn test_listen_on_set_path_is_immediate() {
        let store = store();
        store.set("x", json!(5)).unwrap();

        let persistent = CallRecorder::new();
        store.listen("x", value_recorder(&persistent)).unwrap();
        assert_eq!(persistent.calls(), vec![(json!(5), None)]);
        assert_eq!(store.listener_count("x"), 1);

        let once = CallRecorder::new();
        store.listen("x", value_recorder(&once).once()).unwrap();
        assert_eq!(once.calls(), vec![(json!(5), None)]);
        assert_eq!(store.listener_count("x"), 1);
    }

    #[tokio::test]
    async fn test_listen_on_error_path_is_immediate() {
        let store = store();
        store.set_error("x", test_error("down")).unwrap();

        let errors: CallRecorder<String> = CallRecorder::new();
        {
            let errors = errors.clone();
            let listener = Listener::on_value(|_: &Value, _: Option<&Value>| Ok(()))
                .with_on_error(move |err| {
                    errors.record(err.to_string());
                    Ok(())
                })
                .once();
            store.listen("x", listener).unwrap();
        }

        assert_eq!(errors.calls(), vec!["down".to_string()]);
        assert_eq!(store.listener_count("x"), 0);
    }

    #[tokio::test]
    async fn test_failing_immediate_listener_does_not_fail_listen() {
        let store = store();
        store.set("x", json!(1)).unwrap();
        let listener = Listener::on_value(|_: &Value, _: Option<&Value>| Err(test_error("nope")));
        assert!(store.listen("x", listener).is_ok());

        let panicking = Listener::on_value(|_: &Value, _: Option<&Value>| panic!("listener bug"));
        assert!(store.listen("x", panicking).is_ok());
        assert_eq!(store.listener_count("x"), 2);
    }

    #[tokio::test]
    async fn test_failing_listener_is_isolated() {
        let store = store();
        let calls = CallRecorder::new();
        store
            .listen(
                "x",
                Listener::on_value(|_: &Value, _: Option<&Value>| Err(test_error("broken"))),
            )
            .unwrap();
        store
            .listen(
                "x",
                Listener::on_value(|_: &Value, _: Option<&Value>| panic!("also broken")),
            )
            .unwrap();
        store.listen("x", value_recorder(&calls)).unwrap();

        store.set("x", json!(1)).unwrap();
        store.queue().flush().await.unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(store.queue().stats().failed, 2);
    }

    #[tokio::test]
    async fn test_modify() {
        let store: ObservableStore<i64> = ObservableStore::new(TaskQueue::new());
        let calls: CallRecorder<(i64, Option<i64>)> = CallRecorder::new();
        {
            let calls = calls.clone();
            store
                .listen(
                    "count",
                    Listener::on_value(move |value: &i64, old: Option<&i64>| {
                        calls.record((*value, old.copied()));
                        Ok(())
                    }),
                )
                .unwrap();
        }

        store.set("count", 1).unwrap();
        store.modify("count", |n| n.wrapping_add(10)).unwrap();
        store.queue().flush().await.unwrap();

        assert_eq!(store.get("count"), Some(11));
        assert_eq!(calls.calls(), vec![(1, None), (11, Some(1))]);
    }

    #[tokio::test]
    async fn test_modify_absent_is_not_found() {
        let store = store();
        let result = store.modify("missing", |v| v.clone());
        assert!(matches!(result, Err(PlexusError::NotFound { ref path }) if path == "missing"));
        assert!(!store.has("missing"));
    }

    #[tokio::test]
    async fn test_modify_error_is_store_error() {
        let store = store();
        store.set_error("x", test_error("down")).unwrap();
        let result = store.modify("x", |v| v.clone());
        assert!(matches!(result, Err(PlexusError::Store { .. })));
        assert!(store.has_error("x"));
    }

    #[tokio::test]
    async fn test_delete_does_not_notify() {
        let store = store();
        let calls = CallRecorder::new();
        store.set("x", json!(1)).unwrap();
        store.listen("x", value_recorder(&calls)).unwrap();
        calls.clear();

        assert!(store.delete("x").unwrap());
        assert!(!store.delete("x").unwrap());
        store.queue().flush().await.unwrap();

        assert!(calls.is_empty());
        assert!(!store.has("x"));
        assert_eq!(store.listener_count("x"), 1);
    }

    #[tokio::test]
    async fn test_entry_snapshot() {
        let store = store();
        let before = chrono::Utc::now();
        store.set("x", json!(1)).unwrap();
        let entry = store.entry("x").unwrap();
        assert_eq!(entry.status(), crate::EntryStatus::Set);
        assert_eq!(entry.as_value(), Some(&json!(1)));
        assert!(entry.updated_at() >= before);
        assert!(store.entry("y").is_none());
    }

    #[tokio::test]
    async fn test_wait_for_already_set() {
        let store = store();
        store.set("x", json!("v")).unwrap();
        assert_eq!(store.wait_for("x", None).await.unwrap(), json!("v"));
        assert_eq!(store.listener_count("x"), 0);
    }

    #[tokio::test]
    async fn test_wait_for_already_error() {
        let store = store();
        store.set_error("x", test_error("down")).unwrap();
        let err = store.wait_for("x", None).await.unwrap_err();
        assert!(matches!(err, PlexusError::Store { ref path, .. } if path == "x"));
    }

    #[tokio::test]
    async fn test_wait_for_before_set() {
        let store = store();
        let waiting = store.wait_for("x", Some(Duration::from_secs(1)));
        // registered eagerly, before the future is polled
        assert_eq!(store.listener_count("x"), 1);

        store.set("x", json!("v")).unwrap();
        assert_eq!(waiting.await.unwrap(), json!("v"));
        assert_eq!(store.listener_count("x"), 0);
    }

    #[tokio::test]
    async fn test_wait_for_rejected_by_set_error() {
        let store = store();
        let waiting = store.wait_for("x", None);
        store.set_error("x", test_error("down")).unwrap();

        let err = waiting.await.unwrap_err();
        assert_eq!(err.to_string(), "property x is in error state: down");
    }

    #[tokio::test]
    async fn test_wait_for_times_out() {
        let store = store();
        let err = store
            .wait_for("never", Some(Duration::from_millis(50)))
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(matches!(
            err,
            PlexusError::Timeout {
                timeout_ms: 50,
                ..
            }
        ));
        // the one-time listener is left behind
        assert_eq!(store.listener_count("never"), 1);
    }

    #[tokio::test]
    async fn test_wait_for_store_dropped() {
        let store = store();
        let queue = store.queue().clone();
        let waiting = store.wait_for("x", None);
        drop(store);
        queue.flush().await.unwrap();

        assert!(matches!(waiting.await, Err(PlexusError::QueueClosed)));
    }

    #[tokio::test]
    async fn test_listener_can_set_other_paths() {
        let store = store();
        {
            let downstream = store.clone();
            store
                .listen(
                    "source",
                    Listener::on_value(move |value: &Value, _: Option<&Value>| {
                        downstream.set("derived", json!({ "from": value }))?;
                        Ok(())
                    }),
                )
                .unwrap();
        }

        let derived = store.wait_for("derived", Some(Duration::from_secs(1)));
        store.set("source", json!(3)).unwrap();

        assert_eq!(derived.await.unwrap(), json!({ "from": 3 }));
    }

    #[tokio::test]
    async fn test_listener_added_during_dispatch_is_not_notified_for_that_set() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let store = store();
        let late: CallRecorder<(Value, Option<Value>)> = CallRecorder::new();
        {
            let inner = store.clone();
            let late = late.clone();
            let added = AtomicBool::new(false);
            store
                .listen(
                    "x",
                    Listener::on_value(move |_: &Value, _: Option<&Value>| {
                        if !added.swap(true, Ordering::SeqCst) {
                            inner.listen("x", value_recorder(&late))?;
                        }
                        Ok(())
                    }),
                )
                .unwrap();
        }

        store.set("x", json!(1)).unwrap();
        store.queue().flush().await.unwrap();
        // only the immediate notification from `listen`, nothing queued by set(1)
        assert_eq!(late.calls(), vec![(json!(1), None)]);

        store.set("x", json!(2)).unwrap();
        store.queue().flush().await.unwrap();
        assert_eq!(
            late.calls(),
            vec![(json!(1), None), (json!(2), Some(json!(1)))]
        );
    }

    #[tokio::test]
    async fn test_immediate_notification_precedes_later_sets() {
        let store = store();
        let calls = CallRecorder::new();
        store.set("x", json!(1)).unwrap();

        store.listen("x", value_recorder(&calls)).unwrap();
        store.set("x", json!(2)).unwrap();
        store.queue().flush().await.unwrap();

        assert_eq!(
            calls.calls(),
            vec![(json!(1), None), (json!(2), Some(json!(1)))]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_setters() {
        let store: ObservableStore<u64> = ObservableStore::new(TaskQueue::new());
        let calls: CallRecorder<u64> = CallRecorder::new();
        {
            let calls = calls.clone();
            store
                .listen(
                    "n",
                    Listener::on_value(move |value: &u64, _: Option<&u64>| {
                        calls.record(*value);
                        Ok(())
                    }),
                )
                .unwrap();
        }

        let mut handles = Vec::new();
        for n in 0..8u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.set("n", n).unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert!(calls.wait_for_len(8, Duration::from_secs(1)).await);
        let mut seen = calls.calls();
        seen.sort_unstable();
        assert_eq!(seen, (0..8).collect::<Vec<_>>());
    }
}
