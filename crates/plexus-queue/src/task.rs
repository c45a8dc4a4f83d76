//! Units of deferred work.

use std::fmt;

use plexus_core::{PlexusError, PlexusResult};

/// Outcome of running a task's action.
pub type TaskResult = PlexusResult<()>;

/// The deferred action of a task.
pub type TaskAction = Box<dyn FnOnce() -> TaskResult + Send + 'static>;

/// Callback receiving the failure of a task's action.
pub type ErrorCallback = Box<dyn FnOnce(PlexusError) + Send + 'static>;

/// A unit of deferred work: an action and an optional failure callback.
///
/// Tasks are immutable once built and are consumed by the queue when run.
pub struct Task {
    pub(crate) action: TaskAction,
    pub(crate) on_error: Option<ErrorCallback>,
    pub(crate) label: Option<String>,
}

impl Task {
    /// Create a task from an action.
    pub fn new<F>(action: F) -> Self
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        Self {
            action: Box::new(action),
            on_error: None,
            label: None,
        }
    }

    /// Route a failure of the action to `on_error` instead of the
    /// diagnostic log.
    #[must_use]
    pub fn with_on_error<E>(mut self, on_error: E) -> Self
    where
        E: FnOnce(PlexusError) + Send + 'static,
    {
        self.on_error = Some(Box::new(on_error));
        self
    }

    /// Attach a label used in diagnostics.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The diagnostic label, if any.
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("label", &self.label)
            .field("has_on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}
