//! `multiconn connect`: put instances into the active state.

use anyhow::Result;

use crate::application::{MultiConn, Transport};
use crate::commands::PortArgs;
use crate::output::human::HumanRenderer;
use crate::output::{OutputContext, json};

/// Run `multiconn connect [--port <PORT>]...`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub async fn run<T: Transport>(
    ctx: &OutputContext,
    conn: &mut MultiConn<T>,
    args: &PortArgs,
    as_json: bool,
) -> Result<()> {
    conn.scan(multiconn_common::Port::all()).await;
    let outcomes = if args.ports.is_empty() {
        conn.connect().all().await
    } else {
        conn.connect().from_ports(&args.ports).await
    };

    if as_json {
        json::print(&outcomes)
    } else {
        HumanRenderer::new(ctx).render_outcomes(&outcomes);
        Ok(())
    }
}
