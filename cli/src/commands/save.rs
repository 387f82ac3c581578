//! `multiconn save`: remember the running instances for a later `open`.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use multiconn_common::Port;

use crate::application::{HandleStore, MultiConn, Transport};
use crate::domain::SavedSession;
use crate::output::{OutputContext, json};

/// Arguments for the save command.
#[derive(Args, Debug, Default)]
pub struct SaveArgs {
    /// File to write; defaults to `$MULTICONN_STORE` or `~/.multiconn/handles.json`
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

/// Run `multiconn save [--output <FILE>]`.
///
/// Only instances whose bootstrap fields are all known are saved; the rest
/// could not be reopened anyway.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub async fn run<T: Transport>(
    ctx: &OutputContext,
    conn: &mut MultiConn<T>,
    store: &impl HandleStore,
    as_json: bool,
) -> Result<()> {
    conn.scan(Port::all()).await;

    let mut skipped = Vec::new();
    let mut handles = Vec::new();
    for handle in conn.handles() {
        if handle.is_fully_initialized() {
            handles.push(handle.to_json());
        } else if let Some(port) = handle.port() {
            skipped.push(port);
        }
    }
    let session = SavedSession::new(handles);
    store.save_async(&session).await?;

    if as_json {
        return json::print(&serde_json::json!({
            "saved": session.handles.len(),
            "skipped": skipped,
            "savedAt": session.saved_at,
        }));
    }
    for port in skipped {
        ctx.warn(&format!("Port {port}: instance details incomplete, not saved"));
    }
    ctx.success(&format!("Saved {} instance(s)", session.handles.len()));
    Ok(())
}
