//! Application layer: port trait definitions and use-case orchestration.
//!
//! This module depends only on `crate::domain` and `crate::bridge`, never on
//! `crate::infra`, `crate::commands`, or `crate::output`.

pub mod actions;
pub mod client;
pub mod command;
pub mod handle;
pub mod multi_conn;
pub mod ports;
pub mod surface;

pub use actions::{HandleOutcome, PerPort};
pub use client::ProtocolClient;
pub use command::{Command, NoParams};
pub use handle::{Bootstrap, InstanceHandle};
pub use multi_conn::{MultiConn, PrimaryTarget};
pub use ports::{
    DialogHandler, HandleStore, PortLocator, ProcessLauncher, SpawnedProcess, Transport,
};
pub use surface::CommandSurface;
