//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use multiconn_common::{ApiError, IdentityError, Port};
use thiserror::Error;

// ── Handle errors ─────────────────────────────────────────────────────────────

/// Errors raised by a single instance handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandleError {
    #[error("Handle is unassigned and cannot be connected again.")]
    Unassigned,

    #[error("Handle on port {} is not connected. Call connect first.", display_port(.0))]
    NotConnected(Option<Port>),
}

/// Lifecycle refusals as a failure record with code `INVALID_STATE`.
impl From<HandleError> for ApiError {
    fn from(err: HandleError) -> Self {
        ApiError::invalid_state(err.to_string())
    }
}

#[allow(clippy::ref_option)]
fn display_port(port: &Option<Port>) -> String {
    port.map_or_else(|| "<none>".to_string(), |p| p.to_string())
}

// ── Primary selection errors ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimaryError {
    #[error("Failed to set primary. Port {0} is closed.")]
    NotRegistered(Port),

    #[error("Failed to set primary. No open instance matches the given handle.")]
    HandleNotRegistered,
}

// ── Project errors ────────────────────────────────────────────────────────────

/// Errors raised while opening a project in a new instance or switching the
/// project of a running one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectError {
    #[error("Cannot open project: handle is not fully initialized.")]
    NotFullyInitialized,

    #[error("Cannot open an untitled project.")]
    UntitledProject,

    #[error("Missing password in teamwork credentials.")]
    MissingPassword,

    #[error("Project is already open on port {0}.")]
    AlreadyOpen(Port),

    #[error("Failed to launch {program}: {reason}")]
    Launch { program: String, reason: String },

    #[error("Dialog handler failed for process {pid}: {reason}")]
    DialogHandler { pid: u32, reason: String },

    #[error("Archicad process {pid} did not open a port after {attempts} attempts.")]
    PortNotFound { pid: u32, attempts: u32 },

    #[error("No open instance on port {0}.")]
    NotOpen(Port),

    #[error("Failed to switch project on port {port}: {error}")]
    SwitchFailed { port: Port, error: ApiError },

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

// ── Action errors ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("Failed to quit Archicad on port {port}: {error}")]
    QuitFailed { port: Port, error: ApiError },
}

// ── Orchestrator errors ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultiConnError {
    #[error("No primary instance is set. Run a scan or pick one with set_primary.")]
    NoPrimary,

    #[error(transparent)]
    Handle(#[from] HandleError),

    #[error(transparent)]
    Primary(#[from] PrimaryError),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

// ── Bridge errors ─────────────────────────────────────────────────────────────

/// Errors raised when moving between synchronous and async call sites.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("cannot block inside an async runtime; await the future or use spawn instead")]
    InsideRuntime,

    #[error("no async runtime is running; use block_on instead")]
    NoRuntime,

    #[error("failed to start a runtime: {0}")]
    Runtime(String),
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}
