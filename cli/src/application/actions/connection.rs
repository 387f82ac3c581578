//! Connect, disconnect, and quit.

use multiconn_common::{ApiError, Port};
use tracing::{info, warn};

use super::{HandleOutcome, resolve_headers, resolve_ports};
use crate::application::command::{NoParams, QuitArchicad};
use crate::application::handle::InstanceHandle;
use crate::application::multi_conn::MultiConn;
use crate::application::ports::Transport;
use crate::domain::{ActionError, Status};

// ── Connect ───────────────────────────────────────────────────────────────────

pub struct Connect<'a, T> {
    conn: &'a mut MultiConn<T>,
}

impl<'a, T: Transport> Connect<'a, T> {
    pub(crate) fn new(conn: &'a mut MultiConn<T>) -> Self {
        Self { conn }
    }

    pub async fn from_ports(self, ports: &[Port]) -> Vec<HandleOutcome> {
        let targets = resolve_ports(self.conn, ports);
        self.execute(targets).await
    }

    pub async fn from_headers(self, headers: &[&InstanceHandle<T>]) -> Vec<HandleOutcome> {
        let targets = resolve_headers(self.conn, headers);
        self.execute(targets).await
    }

    pub async fn all(self) -> Vec<HandleOutcome> {
        let targets = self.conn.open_ports();
        self.execute(targets).await
    }

    /// Retry only the handles whose last connect failed.
    pub async fn failed(self) -> Vec<HandleOutcome> {
        let targets: Vec<Port> = self
            .conn
            .failed()
            .into_iter()
            .filter_map(InstanceHandle::port)
            .collect();
        self.execute(targets).await
    }

    async fn execute(self, ports: Vec<Port>) -> Vec<HandleOutcome> {
        let timeout = self.conn.config.command_timeout();
        let mut outcomes = Vec::with_capacity(ports.len());
        for port in ports {
            let Some(handle) = self.conn.registry.get_mut(&port) else {
                continue;
            };
            let error = match handle.connect(timeout).await {
                Ok(Status::Active) => None,
                Ok(_) => handle.product_info().as_ref().err().cloned(),
                Err(e) => Some(ApiError::from(e)),
            };
            outcomes.push(HandleOutcome {
                port,
                status: handle.status(),
                error,
            });
        }
        outcomes
    }
}

// ── Disconnect ────────────────────────────────────────────────────────────────

pub struct Disconnect<'a, T> {
    conn: &'a mut MultiConn<T>,
}

impl<'a, T: Transport> Disconnect<'a, T> {
    pub(crate) fn new(conn: &'a mut MultiConn<T>) -> Self {
        Self { conn }
    }

    pub fn from_ports(self, ports: &[Port]) -> Vec<HandleOutcome> {
        let targets = resolve_ports(self.conn, ports);
        self.execute(&targets)
    }

    pub fn from_headers(self, headers: &[&InstanceHandle<T>]) -> Vec<HandleOutcome> {
        let targets = resolve_headers(self.conn, headers);
        self.execute(&targets)
    }

    pub fn all(self) -> Vec<HandleOutcome> {
        let targets = self.conn.open_ports();
        self.execute(&targets)
    }

    fn execute(self, ports: &[Port]) -> Vec<HandleOutcome> {
        ports
            .iter()
            .filter_map(|port| {
                let handle = self.conn.registry.get_mut(port)?;
                let error = handle.disconnect().err().map(ApiError::from);
                Some(HandleOutcome {
                    port: *port,
                    status: handle.status(),
                    error,
                })
            })
            .collect()
    }
}

// ── Quit ──────────────────────────────────────────────────────────────────────

/// Ask instances to quit, then forget them.
pub struct QuitAndDisconnect<'a, T> {
    conn: &'a mut MultiConn<T>,
}

impl<'a, T: Transport> QuitAndDisconnect<'a, T> {
    pub(crate) fn new(conn: &'a mut MultiConn<T>) -> Self {
        Self { conn }
    }

    /// # Errors
    ///
    /// Stops at the first instance that refuses to quit; see [`Self::all`].
    pub async fn from_ports(self, ports: &[Port]) -> Result<Vec<InstanceHandle<T>>, ActionError> {
        let targets = resolve_ports(self.conn, ports);
        self.execute(targets).await
    }

    /// # Errors
    ///
    /// Stops at the first instance that refuses to quit; see [`Self::all`].
    pub async fn from_headers(
        self,
        headers: &[&InstanceHandle<T>],
    ) -> Result<Vec<InstanceHandle<T>>, ActionError> {
        let targets = resolve_headers(self.conn, headers);
        self.execute(targets).await
    }

    /// Quit every registered instance and return their unassigned handles.
    ///
    /// # Errors
    ///
    /// Returns `ActionError::QuitFailed` for the first instance whose quit
    /// command fails. That instance stays registered; instances quit before
    /// it are already removed.
    pub async fn all(self) -> Result<Vec<InstanceHandle<T>>, ActionError> {
        let targets = self.conn.open_ports();
        self.execute(targets).await
    }

    async fn execute(self, ports: Vec<Port>) -> Result<Vec<InstanceHandle<T>>, ActionError> {
        let mut quit = Vec::with_capacity(ports.len());
        let mut removed = Vec::with_capacity(ports.len());
        let mut failure = None;
        for port in ports {
            let client = self.conn.client_for(port);
            match client.execute::<QuitArchicad>(&NoParams {}).await {
                Ok(_) => {
                    if let Some(mut handle) = self.conn.registry.remove(&port) {
                        handle.unassign();
                        quit.push(handle);
                    }
                    removed.push(port);
                    info!(%port, "archicad quit");
                }
                Err(error) => {
                    warn!(%port, code = error.code, message = %error.message, "quit failed");
                    failure = Some(ActionError::QuitFailed { port, error });
                    break;
                }
            }
        }
        self.conn.after_removal(&removed).await;
        match failure {
            Some(err) => Err(err),
            None => Ok(quit),
        }
    }
}
