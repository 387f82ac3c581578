//! `multiconn switch`: open another project in a running instance.

use anyhow::Result;
use clap::Args;
use multiconn_common::Port;

use crate::application::{MultiConn, Transport};
use crate::output::human::{HumanRenderer, InstanceRow};
use crate::output::{OutputContext, json};

/// Arguments for the switch command.
#[derive(Args, Debug)]
pub struct SwitchArgs {
    /// Port of the instance to switch
    #[arg(long, value_name = "PORT")]
    pub port: Port,

    /// Project file to open there
    pub path: String,
}

/// Run `multiconn switch --port <PORT> <PATH>`.
///
/// # Errors
///
/// Returns an error if nothing runs on the port or Archicad refuses to open
/// the project.
pub async fn run<T: Transport>(
    ctx: &OutputContext,
    conn: &mut MultiConn<T>,
    args: &SwitchArgs,
    as_json: bool,
) -> Result<()> {
    conn.scan(Port::all()).await;
    let handle = conn
        .switch_project()
        .from_path(args.port, &args.path)
        .await?;
    let row = InstanceRow::from_handle(&handle, conn.primary_port());

    if as_json {
        json::print(&row)
    } else {
        ctx.success(&format!(
            "Port {} now has {} open",
            args.port,
            row.project.as_deref().unwrap_or(&args.path)
        ));
        HumanRenderer::new(ctx).render_instances(&[row]);
        Ok(())
    }
}
