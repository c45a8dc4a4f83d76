//! FIFO task queue drained on a Tokio runtime.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use plexus_core::{PlexusError, PlexusResult};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{trace, warn};

use crate::guard::catch_panic;
use crate::task::Task;

/// Number of tasks run back to back before the drain yields to the runtime.
///
/// The drain still runs to exhaustion before going idle; yielding only lets
/// timers and other tasks on the same runtime make progress in between.
const DRAIN_BATCH: usize = 32;

/// Counters describing what the queue has run so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Tasks whose action returned `Ok`.
    pub completed: u64,
    /// Tasks whose action returned `Err` or panicked.
    pub failed: u64,
}

/// A FIFO queue of deferred callbacks.
///
/// Enqueued tasks run one at a time, in order, on the runtime the queue is
/// bound to. Enqueueing never runs a task in the caller's stack frame: if the
/// queue is idle, a drain is spawned and the caller returns immediately.
///
/// A failing or panicking task is isolated. Its error goes to the task's
/// `on_error` callback if it has one and to the `tracing` log otherwise;
/// the drain continues with the next task either way.
///
/// Cloning a `TaskQueue` creates a new handle to the same queue.
#[derive(Clone)]
pub struct TaskQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    state: Mutex<QueueState>,
    handle: Handle,
    completed: AtomicU64,
    failed: AtomicU64,
}

#[derive(Default)]
struct QueueState {
    pending: VecDeque<Task>,
    draining: bool,
}

impl TaskQueue {
    /// Create a queue bound to the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside the context of a Tokio runtime. Use
    /// [`TaskQueue::with_handle`] to bind to a runtime explicitly.
    #[must_use]
    pub fn new() -> Self {
        Self::with_handle(Handle::current())
    }

    /// Create a queue that drains on the given runtime.
    #[must_use]
    pub fn with_handle(handle: Handle) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                handle,
                completed: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
        }
    }

    /// Append a task to the tail of the queue.
    ///
    /// If the queue is idle a drain is scheduled on the runtime; the task
    /// never runs before this call returns.
    pub fn enqueue(&self, task: Task) {
        let schedule = {
            let mut state = self.inner.lock();
            state.pending.push_back(task);
            !std::mem::replace(&mut state.draining, true)
        };

        trace!(schedule_drain = schedule, "Task enqueued");

        if schedule {
            let inner = Arc::clone(&self.inner);
            drop(self.inner.handle.spawn(async move {
                inner.drain().await;
            }));
        }
    }

    /// The runtime the queue drains on.
    ///
    /// Work started by a task that outlives it, such as an asynchronous
    /// handler's reply, is spawned here.
    #[must_use]
    pub fn handle(&self) -> &Handle {
        &self.inner.handle
    }

    /// Wait until every task enqueued before this call has run.
    ///
    /// The marker task is enqueued immediately; the returned future only
    /// observes its completion.
    ///
    /// # Errors
    ///
    /// Resolves to [`PlexusError::QueueClosed`] if the runtime shut down
    /// before the marker ran.
    pub fn flush(&self) -> impl Future<Output = PlexusResult<()>> + Send + 'static {
        let (tx, rx) = oneshot::channel();
        self.enqueue(
            Task::new(move || {
                let _ = tx.send(());
                Ok(())
            })
            .with_label("flush"),
        );
        async move { rx.await.map_err(|_| PlexusError::QueueClosed) }
    }

    /// Number of tasks waiting to run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    /// Whether no tasks are waiting to run.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().pending.is_empty()
    }

    /// Whether a drain is scheduled or in progress.
    #[must_use]
    pub fn is_draining(&self) -> bool {
        self.inner.lock().draining
    }

    /// Snapshot of the completion counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        QueueStats {
            completed: self.inner.completed.load(Ordering::Relaxed),
            failed: self.inner.failed.load(Ordering::Relaxed),
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("TaskQueue")
            .field("pending", &state.pending.len())
            .field("draining", &state.draining)
            .field("stats", &self.stats())
            .finish()
    }
}

impl QueueInner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| {
            warn!("TaskQueue lock poisoned, recovering");
            e.into_inner()
        })
    }

    async fn drain(&self) {
        let mut batch: usize = 0;
        loop {
            let next = {
                let mut state = self.lock();
                let next = state.pending.pop_front();
                if next.is_none() {
                    state.draining = false;
                }
                next
            };
            let Some(task) = next else {
                trace!("Task queue drained");
                return;
            };

            self.run(task);

            batch = batch.wrapping_add(1);
            if batch.is_multiple_of(DRAIN_BATCH) {
                tokio::task::yield_now().await;
            }
        }
    }

    fn run(&self, task: Task) {
        let Task {
            action,
            on_error,
            label,
        } = task;
        let label = label.as_deref().unwrap_or("anonymous");

        let Err(err) = catch_panic(action) else {
            self.completed.fetch_add(1, Ordering::Relaxed);
            return;
        };
        self.failed.fetch_add(1, Ordering::Relaxed);

        match on_error {
            Some(on_error) => {
                let reported = catch_panic(|| {
                    on_error(err);
                    Ok(())
                });
                if let Err(e) = reported {
                    warn!(task = label, error = %e, "Task error callback panicked");
                }
            },
            None => {
                warn!(task = label, error = %err, "Queued task failed");
            },
        }
    }
}
