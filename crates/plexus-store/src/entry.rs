//! Stored property entries.

use chrono::{DateTime, Utc};
use plexus_core::SharedError;
use serde::{Deserialize, Serialize};

/// Status tag of a [`PropertyEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// The property holds a value.
    Set,
    /// The property holds an error.
    Error,
}

/// Content of a [`PropertyEntry`].
#[derive(Debug, Clone)]
pub enum EntryState<V> {
    /// A value set with `set` or `modify`.
    Set(V),
    /// An error set with `set_error`.
    Error(SharedError),
}

/// The entry stored for one property path.
#[derive(Debug, Clone)]
pub struct PropertyEntry<V> {
    state: EntryState<V>,
    updated_at: DateTime<Utc>,
}

impl<V> PropertyEntry<V> {
    pub(crate) fn value(value: V) -> Self {
        Self {
            state: EntryState::Set(value),
            updated_at: Utc::now(),
        }
    }

    pub(crate) fn error(error: SharedError) -> Self {
        Self {
            state: EntryState::Error(error),
            updated_at: Utc::now(),
        }
    }

    /// The status tag.
    #[must_use]
    pub fn status(&self) -> EntryStatus {
        match self.state {
            EntryState::Set(_) => EntryStatus::Set,
            EntryState::Error(_) => EntryStatus::Error,
        }
    }

    /// The entry content.
    #[must_use]
    pub fn state(&self) -> &EntryState<V> {
        &self.state
    }

    /// The stored value, if the entry is `set`.
    #[must_use]
    pub fn as_value(&self) -> Option<&V> {
        match &self.state {
            EntryState::Set(value) => Some(value),
            EntryState::Error(_) => None,
        }
    }

    /// The stored error, if the entry is `error`.
    #[must_use]
    pub fn as_error(&self) -> Option<&SharedError> {
        match &self.state {
            EntryState::Set(_) => None,
            EntryState::Error(error) => Some(error),
        }
    }

    /// Time of the last mutation.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(crate) fn into_value(self) -> Option<V> {
        match self.state {
            EntryState::Set(value) => Some(value),
            EntryState::Error(_) => None,
        }
    }
}
