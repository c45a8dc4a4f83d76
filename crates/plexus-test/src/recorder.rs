//! Ordered recording of callback invocations.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

/// A thread-safe, ordered log of values seen by callbacks.
///
/// Cloning a `CallRecorder` creates a new handle to the same log, so one
/// clone can be moved into a handler while the test keeps another.
#[derive(Debug)]
pub struct CallRecorder<T> {
    calls: Arc<Mutex<Vec<T>>>,
    notify: Arc<Notify>,
}

impl<T> Clone for CallRecorder<T> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
            notify: Arc::clone(&self.notify),
        }
    }
}

impl<T> Default for CallRecorder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> CallRecorder<T> {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Append a call.
    pub fn record(&self, value: T) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.push(value);
        }
        self.notify.notify_waiters();
    }

    /// Number of recorded calls.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget all recorded calls.
    pub fn clear(&self) {
        if let Ok(mut guard) = self.calls.lock() {
            guard.clear();
        }
    }

    /// Wait until at least `n` calls were recorded.
    ///
    /// Returns `false` if `timeout` elapsed first.
    pub async fn wait_for_len(&self, n: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.len() >= n {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

impl<T: Clone> CallRecorder<T> {
    /// Snapshot of the recorded calls, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<T> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}
