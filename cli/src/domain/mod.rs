//! Domain layer: pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod config;
pub mod error;
pub mod session;
pub mod status;

pub use config::MultiConnConfig;
pub use error::{
    ActionError, BridgeError, ConfigError, HandleError, MultiConnError, PrimaryError, ProjectError,
};
pub use session::SavedSession;
pub use status::Status;
