//! Sync/async bridge.
//!
//! Callers pick the entry point explicitly: `block_on` from synchronous code,
//! `spawn` from inside a runtime. `dispatch` picks one of the two from the
//! calling context for code that genuinely runs in both.

use std::future::Future;

use tokio::runtime::{Builder, Handle};
use tokio::task::{JoinError, JoinHandle};

pub use crate::domain::error::BridgeError;

/// Whether the current thread runs inside a Tokio runtime.
#[must_use]
pub fn in_runtime() -> bool {
    Handle::try_current().is_ok()
}

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// # Errors
///
/// Returns `BridgeError::InsideRuntime` when called from within a runtime,
/// where blocking would stall the caller's executor.
pub fn block_on<F: Future>(future: F) -> Result<F::Output, BridgeError> {
    if in_runtime() {
        return Err(BridgeError::InsideRuntime);
    }
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| BridgeError::Runtime(e.to_string()))?;
    Ok(runtime.block_on(future))
}

/// Schedule `future` on the current runtime.
///
/// The task keeps running if the handle is dropped; holders abort it
/// themselves.
///
/// # Errors
///
/// Returns `BridgeError::NoRuntime` outside a runtime.
pub fn spawn<F>(future: F) -> Result<JoinHandle<F::Output>, BridgeError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handle = Handle::try_current().map_err(|_| BridgeError::NoRuntime)?;
    Ok(handle.spawn(future))
}

/// Outcome of [`dispatch`].
#[derive(Debug)]
pub enum Dispatch<T> {
    /// Ran to completion on a private runtime.
    Completed(T),
    /// Scheduled on the caller's runtime.
    Spawned(JoinHandle<T>),
}

impl<T> Dispatch<T> {
    /// Await the value, whichever way it was produced.
    ///
    /// # Errors
    ///
    /// Returns the `JoinError` of a spawned task that panicked or was aborted.
    pub async fn resolve(self) -> Result<T, JoinError> {
        match self {
            Self::Completed(value) => Ok(value),
            Self::Spawned(handle) => handle.await,
        }
    }

    #[must_use]
    pub fn is_spawned(&self) -> bool {
        matches!(self, Self::Spawned(_))
    }
}

/// Spawn inside a runtime, block outside one.
///
/// # Errors
///
/// Returns `BridgeError::Runtime` if a private runtime cannot be built.
pub fn dispatch<F>(future: F) -> Result<Dispatch<F::Output>, BridgeError>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) => Ok(Dispatch::Spawned(handle.spawn(future))),
        Err(_) => block_on(future).map(Dispatch::Completed),
    }
}
