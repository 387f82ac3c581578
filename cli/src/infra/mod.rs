//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: HTTP transport, process
//! launching, socket inspection, and the saved-handle file.
//!
//! Imports from `crate::domain` and `crate::application` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod config;
pub mod dialog;
pub mod http;
pub mod launcher;
pub mod port_locator;
pub mod store;

use anyhow::Result;

use crate::application::MultiConn;
use crate::domain::MultiConnConfig;
use dialog::NoopDialogHandler;
use http::HttpTransport;
use launcher::DetachedLauncher;

impl MultiConn<HttpTransport> {
    /// Orchestrator wired to the production infrastructure.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn with_defaults(config: MultiConnConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(config.host.clone())?;
        Ok(Self::new(
            config,
            transport,
            Box::new(DetachedLauncher),
            Box::new(NoopDialogHandler),
            port_locator::platform_locator(),
        ))
    }
}
