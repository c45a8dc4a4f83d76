//! Listener configurations registered on a property path.

use std::fmt;
use std::sync::Arc;

use plexus_core::{BoxError, SharedError};

/// Value returned by a listener callback.
pub type ListenerResult = Result<(), BoxError>;

/// Callback receiving `(new_value, old_value)`.
///
/// `old_value` is `None` when the path had no value before, including when
/// it held an error.
pub type ValueFn<V> = Arc<dyn Fn(&V, Option<&V>) -> ListenerResult + Send + Sync + 'static>;

/// Callback receiving the error stored with `set_error`.
pub type ErrorFn = Arc<dyn Fn(&SharedError) -> ListenerResult + Send + Sync + 'static>;

/// A listener configuration: an on-value callback, an optional on-error
/// callback and a one-time flag.
///
/// ```rust
/// use plexus_store::Listener;
/// use serde_json::Value;
///
/// let listener = Listener::on_value(|value: &Value, _old: Option<&Value>| {
///     tracing::info!(%value, "user changed");
///     Ok(())
/// })
/// .with_on_error(|err| {
///     tracing::warn!(error = %err, "user lookup failed");
///     Ok(())
/// })
/// .once();
/// assert!(listener.is_once());
/// ```
pub struct Listener<V> {
    pub(crate) on_value: ValueFn<V>,
    pub(crate) on_error: Option<ErrorFn>,
    pub(crate) once: bool,
}

impl<V> Listener<V> {
    /// Create a persistent listener from an on-value callback.
    pub fn on_value<F>(on_value: F) -> Self
    where
        F: Fn(&V, Option<&V>) -> ListenerResult + Send + Sync + 'static,
    {
        Self {
            on_value: Arc::new(on_value),
            on_error: None,
            once: false,
        }
    }

    /// Also receive errors set on the path.
    ///
    /// Without an on-error callback, error notifications are skipped for
    /// this listener.
    #[must_use]
    pub fn with_on_error<E>(mut self, on_error: E) -> Self
    where
        E: Fn(&SharedError) -> ListenerResult + Send + Sync + 'static,
    {
        self.on_error = Some(Arc::new(on_error));
        self
    }

    /// Remove the listener after its first notification.
    #[must_use]
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Whether the listener fires at most once.
    #[must_use]
    pub fn is_once(&self) -> bool {
        self.once
    }
}

impl<V> fmt::Debug for Listener<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("has_on_error", &self.on_error.is_some())
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}
