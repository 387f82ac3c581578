//! Dialog handling: the default `DialogHandler` does nothing.

use anyhow::Result;
use tracing::debug;

use crate::application::ports::{DialogHandler, SpawnedProcess};

/// Leaves any startup dialogs for the user to answer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDialogHandler;

impl DialogHandler for NoopDialogHandler {
    fn start(&self, process: &SpawnedProcess) -> Result<()> {
        debug!(pid = process.pid, "no dialog handler configured");
        Ok(())
    }
}
