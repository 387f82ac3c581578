//! Bulk actions over the registry.
//!
//! Each manager borrows the orchestrator, resolves its targets from ports,
//! from handles or from the whole registry, and then acts on them one by one
//! in ascending port order.

mod connection;
mod project;
mod refresh;
mod run;

use std::collections::BTreeSet;

use multiconn_common::{ApiError, Port};
use serde::Serialize;
use tracing::warn;

pub use connection::{Connect, Disconnect, QuitAndDisconnect};
pub use project::{FindArchicad, OpenProject, SwitchProject};
pub use refresh::Refresh;
pub use run::{PerPort, Run};

use crate::application::handle::InstanceHandle;
use crate::application::multi_conn::MultiConn;
use crate::application::ports::Transport;
use crate::domain::Status;

/// What happened to one handle during connect or disconnect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandleOutcome {
    pub port: Port,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

/// Registered ports among `ports`, deduplicated and sorted.
pub(crate) fn resolve_ports<T: Transport>(conn: &MultiConn<T>, ports: &[Port]) -> Vec<Port> {
    let mut resolved = BTreeSet::new();
    for port in ports {
        if conn.registry.contains_key(port) {
            resolved.insert(*port);
        } else {
            warn!(%port, "no open instance on port, skipping");
        }
    }
    resolved.into_iter().collect()
}

/// Registry ports for `headers`.
///
/// A fully initialized header resolves only to a registered instance equal
/// to it, wherever that instance now listens. A partially initialized header
/// cannot be compared and resolves to the entry on its own port.
pub(crate) fn resolve_headers<T: Transport>(
    conn: &MultiConn<T>,
    headers: &[&InstanceHandle<T>],
) -> Vec<Port> {
    let mut resolved = BTreeSet::new();
    for header in headers {
        let found = if header.is_fully_initialized() {
            conn.registry
                .iter()
                .find(|(_, registered)| registered.same_instance(header))
                .map(|(port, _)| *port)
        } else {
            header.port().filter(|port| conn.registry.contains_key(port))
        };
        match found {
            Some(port) => {
                resolved.insert(port);
            }
            None => warn!(port = ?header.port(), "handle matches no open instance, skipping"),
        }
    }
    resolved.into_iter().collect()
}
