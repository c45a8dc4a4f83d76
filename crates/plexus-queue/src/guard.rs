//! Panic isolation for callbacks.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

use futures::FutureExt;
use plexus_core::{PlexusError, PlexusResult};

/// Run `f`, converting a panic into [`PlexusError::Panicked`].
///
/// Callbacks run by the queue, the bus and the store go through this guard so
/// one misbehaving callback cannot unwind through the drain loop.
pub fn catch_panic<R>(f: impl FnOnce() -> PlexusResult<R>) -> PlexusResult<R> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .unwrap_or_else(|payload| Err(PlexusError::Panicked(panic_message(payload.as_ref()))))
}

/// Await `future`, converting a panic while polling it into
/// [`PlexusError::Panicked`].
pub async fn catch_panic_async<R>(future: impl Future<Output = PlexusResult<R>>) -> PlexusResult<R> {
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(PlexusError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
