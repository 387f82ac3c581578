//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and `multiconn_common`, never
//! from `crate::infra`, `crate::commands`, or `crate::output`.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use multiconn_common::{CommandResult, Port};
use serde_json::Value;

use crate::domain::SavedSession;

// ── Transport Port ────────────────────────────────────────────────────────────

/// Moves JSON between this process and one Archicad endpoint.
///
/// Implementations never fail with `Err` for I/O reasons: every failure is
/// mapped onto a failure record (`-1` connection, `-2` timeout, `-3`
/// malformed body, HTTP status code otherwise). Clones share the underlying
/// connection pool.
pub trait Transport: Clone + Send + Sync + 'static {
    /// POST `body` to the endpoint on `port` and return the decoded body.
    fn post_json(
        &self,
        port: Port,
        body: &Value,
        timeout: Duration,
    ) -> impl Future<Output = CommandResult<Value>> + Send;

    /// Liveness check: `true` when the endpoint answers `200 OK` in time.
    fn probe(&self, port: Port, timeout: Duration) -> impl Future<Output = bool> + Send;
}

// ── Process Ports ─────────────────────────────────────────────────────────────

/// A process started by a [`ProcessLauncher`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnedProcess {
    pub pid: u32,
    pub program: String,
    pub args: Vec<String>,
}

/// Starts detached Archicad processes.
pub trait ProcessLauncher: Send + Sync {
    /// Start `program` with `args` without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned.
    fn launch(&self, program: &str, args: &[String]) -> Result<SpawnedProcess>;
}

/// Dismisses the modal dialogs a freshly launched Archicad may show.
pub trait DialogHandler: Send + Sync {
    /// Start handling dialogs for `process`. Must not block for long.
    ///
    /// # Errors
    ///
    /// Returns an error if the handler cannot attach to the process.
    fn start(&self, process: &SpawnedProcess) -> Result<()>;
}

/// Finds the TCP ports a process is listening on.
pub trait PortLocator: Send + Sync {
    /// Ports `pid` currently listens on. May include ports outside the
    /// Archicad window; callers filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the platform offers no way to inspect sockets.
    fn listening_ports(&self, pid: u32) -> Result<Vec<u16>>;
}

// ── Persistence Port ──────────────────────────────────────────────────────────

/// Abstracts persistence of saved handle sets.
#[allow(async_fn_in_trait)]
pub trait HandleStore {
    /// Load the saved session, returning `None` if nothing was saved.
    async fn load_async(&self) -> Result<Option<SavedSession>>;
    /// Persist the given session, replacing any previous one.
    async fn save_async(&self, session: &SavedSession) -> Result<()>;
}
