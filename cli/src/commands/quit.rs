//! `multiconn quit`: ask instances to exit.

use anyhow::{Result, bail};
use clap::Args;
use multiconn_common::Port;

use crate::application::{MultiConn, Transport};
use crate::output::{OutputContext, json};

/// Arguments for the quit command.
#[derive(Args, Debug, Default)]
pub struct QuitArgs {
    /// Instance port to quit (repeatable)
    #[arg(long = "port", value_name = "PORT", conflicts_with = "all")]
    pub ports: Vec<Port>,

    /// Quit every running instance
    #[arg(long)]
    pub all: bool,
}

/// Run `multiconn quit (--port <PORT>... | --all)`.
///
/// # Errors
///
/// Returns an error if no target is given or an instance refuses to quit;
/// instances quit before the failure stay quit.
pub async fn run<T: Transport>(
    ctx: &OutputContext,
    conn: &mut MultiConn<T>,
    args: &QuitArgs,
    as_json: bool,
) -> Result<()> {
    if !args.all && args.ports.is_empty() {
        bail!("Specify --port <PORT> or --all");
    }
    conn.scan(Port::all()).await;
    let open = conn.open_ports();

    // Returned handles are unassigned, so the ports are read off the registry.
    if args.all {
        conn.quit().all().await?;
    } else {
        conn.quit().from_ports(&args.ports).await?;
    }
    let ports: Vec<Port> = open
        .into_iter()
        .filter(|port| conn.get(*port).is_none())
        .collect();

    if as_json {
        return json::print(&serde_json::json!({ "quit": ports }));
    }
    if ports.is_empty() {
        ctx.warn("No matching instances.");
    }
    for port in ports {
        ctx.success(&format!("Quit Archicad on port {port}"));
    }
    Ok(())
}
