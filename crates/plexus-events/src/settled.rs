//! Settled outcomes of an aggregated publish.

use plexus_core::{PlexusError, PlexusResult};
use serde_json::Value;

/// Outcome of one subscriber's handler in a
/// [`publish_async`](crate::PubSubBus::publish_async) aggregate.
#[derive(Debug, Clone)]
pub enum Settled {
    /// The handler returned a reply.
    Fulfilled(Value),
    /// The handler failed or panicked.
    Rejected(PlexusError),
}

impl Settled {
    /// Whether the handler succeeded.
    #[must_use]
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    /// Whether the handler failed.
    #[must_use]
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }

    /// The handler's reply, if it succeeded.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Fulfilled(value) => Some(value),
            Self::Rejected(_) => None,
        }
    }

    /// The failure, if the handler failed.
    #[must_use]
    pub fn error(&self) -> Option<&PlexusError> {
        match self {
            Self::Fulfilled(_) => None,
            Self::Rejected(err) => Some(err),
        }
    }

    /// Convert back into a `Result`.
    ///
    /// # Errors
    ///
    /// Returns the rejection error if the handler failed.
    pub fn into_result(self) -> PlexusResult<Value> {
        match self {
            Self::Fulfilled(value) => Ok(value),
            Self::Rejected(err) => Err(err),
        }
    }
}

impl From<PlexusResult<Value>> for Settled {
    fn from(result: PlexusResult<Value>) -> Self {
        match result {
            Ok(value) => Self::Fulfilled(value),
            Err(err) => Self::Rejected(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accessors() {
        let ok = Settled::from(Ok(json!(1)));
        assert!(ok.is_fulfilled());
        assert_eq!(ok.value(), Some(&json!(1)));
        assert!(ok.error().is_none());

        let err = Settled::from(Err(PlexusError::QueueClosed));
        assert!(err.is_rejected());
        assert!(err.value().is_none());
        assert!(matches!(err.into_result(), Err(PlexusError::QueueClosed)));
    }
}
