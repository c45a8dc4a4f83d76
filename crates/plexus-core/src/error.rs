//! Error types for plexus coordination operations.

use std::sync::Arc;

use thiserror::Error;

/// Boxed error returned by subscriber and listener callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Reference-counted error that can be handed to several observers at once.
///
/// Error objects stored in an observable store (and failures wrapped into a
/// [`PlexusError`]) use this form so that every waiting listener receives the
/// same underlying error.
pub type SharedError = Arc<dyn std::error::Error + Send + Sync>;

/// Errors that can occur in the task queue, the bus and the store.
#[derive(Debug, Clone, Error)]
pub enum PlexusError {
    /// Invalid call shape, such as a missing message name or an empty path.
    #[error("usage error: {0}")]
    Usage(String),

    /// A bus subscriber returned an error while handling a message.
    #[error("exception running message {message} on channel {channel}, sub_{subscription}: {source}")]
    Handler {
        /// Channel the message was published on.
        channel: String,
        /// Message name.
        message: String,
        /// Identifier of the failing subscription.
        subscription: u64,
        /// The error returned by the handler.
        #[source]
        source: SharedError,
    },

    /// A store listener returned an error while being notified.
    #[error("listener on {path} failed: {source}")]
    Listener {
        /// Property path the listener is registered on.
        path: String,
        /// The error returned by the listener.
        #[source]
        source: SharedError,
    },

    /// Waiting for a property exceeded its deadline.
    #[error("timed out after {timeout_ms}ms waiting for {path}")]
    Timeout {
        /// Property path that was awaited.
        path: String,
        /// Time awaited before giving up, in milliseconds.
        timeout_ms: u64,
    },

    /// The property is in the error state.
    #[error("property {path} is in error state: {source}")]
    Store {
        /// Property path holding the error.
        path: String,
        /// The stored error object.
        #[source]
        source: SharedError,
    },

    /// The property has no entry.
    #[error("property {path} is not set")]
    NotFound {
        /// Property path that was looked up.
        path: String,
    },

    /// A callback panicked while running on the task queue.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task queue was torn down before the awaited task ran.
    #[error("task queue closed before the task completed")]
    QueueClosed,
}

impl PlexusError {
    /// Wrap a subscriber failure.
    #[must_use]
    pub fn handler(
        channel: impl Into<String>,
        message: impl Into<String>,
        subscription: u64,
        source: BoxError,
    ) -> Self {
        Self::Handler {
            channel: channel.into(),
            message: message.into(),
            subscription,
            source: Arc::from(source),
        }
    }

    /// Wrap a store listener failure.
    #[must_use]
    pub fn listener(path: impl Into<String>, source: BoxError) -> Self {
        Self::Listener {
            path: path.into(),
            source: Arc::from(source),
        }
    }

    /// Whether this error came from a timed-out wait.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this error was produced by a failing callback (handler,
    /// listener or a panic inside either).
    #[must_use]
    pub fn is_callback_failure(&self) -> bool {
        matches!(
            self,
            Self::Handler { .. } | Self::Listener { .. } | Self::Panicked(_)
        )
    }
}

/// Result type for plexus operations.
pub type PlexusResult<T> = Result<T, PlexusError>;
