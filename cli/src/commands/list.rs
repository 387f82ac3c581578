//! `multiconn list`: scan the port window and show every instance.

use anyhow::Result;

use crate::application::{MultiConn, Transport};
use crate::output::human::{HumanRenderer, InstanceRow};
use crate::output::{OutputContext, json};

/// Run `multiconn list`.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub async fn run<T: Transport>(
    ctx: &OutputContext,
    conn: &mut MultiConn<T>,
    as_json: bool,
) -> Result<()> {
    conn.discover(None).await?;
    let rows = rows(conn);

    if as_json {
        json::print(&serde_json::json!({
            "primary": conn.primary_port(),
            "instances": rows,
        }))
    } else {
        HumanRenderer::new(ctx).render_instances(&rows);
        Ok(())
    }
}

/// Table rows for every registered instance.
#[must_use]
pub fn rows<T: Transport>(conn: &MultiConn<T>) -> Vec<InstanceRow> {
    let primary = conn.primary_port();
    conn.handles()
        .map(|handle| InstanceRow::from_handle(handle, primary))
        .collect()
}
