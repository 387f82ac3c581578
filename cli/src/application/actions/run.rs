//! Running caller-supplied work against one or many instances.

use std::collections::BTreeMap;
use std::future::Future;

use futures::future::join_all;
use multiconn_common::{ApiError, CommandResult, Port};
use serde::Serialize;
use tracing::{debug, warn};

use crate::application::handle::InstanceHandle;
use crate::application::multi_conn::MultiConn;
use crate::application::ports::Transport;
use crate::domain::MultiConnError;

/// One result per port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PerPort<R>(BTreeMap<Port, CommandResult<R>>);

impl<R> PerPort<R> {
    #[must_use]
    pub fn get(&self, port: Port) -> Option<&CommandResult<R>> {
        self.0.get(&port)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Port, &CommandResult<R>)> {
        self.0.iter()
    }

    #[must_use]
    pub fn successful(&self) -> BTreeMap<Port, &R> {
        self.0
            .iter()
            .filter_map(|(port, r)| r.as_ref().ok().map(|v| (*port, v)))
            .collect()
    }

    #[must_use]
    pub fn errors(&self) -> BTreeMap<Port, &ApiError> {
        self.0
            .iter()
            .filter_map(|(port, r)| r.as_ref().err().map(|e| (*port, e)))
            .collect()
    }

    #[must_use]
    pub fn into_inner(self) -> BTreeMap<Port, CommandResult<R>> {
        self.0
    }
}

impl<R> FromIterator<(Port, CommandResult<R>)> for PerPort<R> {
    fn from_iter<I: IntoIterator<Item = (Port, CommandResult<R>)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Run a function on the primary or on every active handle.
///
/// The function receives an owned clone of the handle, so it can use
/// `standard()` or `core()` freely and the futures need not borrow the
/// orchestrator.
pub struct Run<'a, T> {
    conn: &'a MultiConn<T>,
}

impl<'a, T: Transport> Run<'a, T> {
    pub(crate) fn new(conn: &'a MultiConn<T>) -> Self {
        Self { conn }
    }

    /// Run `f` on the primary.
    ///
    /// # Errors
    ///
    /// Returns `MultiConnError::NoPrimary` when no primary is set.
    pub async fn single<F, Fut, R>(&self, f: F) -> Result<CommandResult<R>, MultiConnError>
    where
        F: FnOnce(InstanceHandle<T>) -> Fut,
        Fut: Future<Output = CommandResult<R>>,
    {
        let primary = self.conn.primary().ok_or(MultiConnError::NoPrimary)?;
        debug!(port = ?primary.port(), "running on primary");
        Ok(f(primary.clone()).await)
    }

    /// Run `f` on each active handle, one after another.
    pub async fn multi<F, Fut, R>(&self, f: F) -> PerPort<R>
    where
        F: Fn(InstanceHandle<T>) -> Fut,
        Fut: Future<Output = CommandResult<R>>,
    {
        let mut results = BTreeMap::new();
        for (port, handle) in self.targets() {
            let result = f(handle).await;
            log_failure(port, result.as_ref().err());
            results.insert(port, result);
        }
        PerPort(results)
    }

    /// Run `f` on all active handles at once.
    pub async fn multi_concurrent<F, Fut, R>(&self, f: F) -> PerPort<R>
    where
        F: Fn(InstanceHandle<T>) -> Fut,
        Fut: Future<Output = CommandResult<R>>,
    {
        let targets = self.targets();
        debug!(count = targets.len(), "running concurrently");
        let runs = targets.into_iter().map(|(port, handle)| {
            let fut = f(handle);
            async move { (port, fut.await) }
        });
        join_all(runs)
            .await
            .into_iter()
            .inspect(|(port, result)| log_failure(*port, result.as_ref().err()))
            .collect()
    }

    fn targets(&self) -> Vec<(Port, InstanceHandle<T>)> {
        self.conn
            .active()
            .into_iter()
            .filter_map(|h| h.port().map(|port| (port, h.clone())))
            .collect()
    }
}

fn log_failure(port: Port, error: Option<&ApiError>) {
    if let Some(err) = error {
        warn!(%port, code = err.code, message = %err.message, "run failed");
    }
}
