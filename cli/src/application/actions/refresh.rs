use multiconn_common::Port;

use crate::application::handle::InstanceHandle;
use crate::application::multi_conn::MultiConn;
use crate::application::ports::Transport;

/// Re-scan a subset of the port window.
pub struct Refresh<'a, T> {
    conn: &'a mut MultiConn<T>,
}

impl<'a, T: Transport> Refresh<'a, T> {
    pub(crate) fn new(conn: &'a mut MultiConn<T>) -> Self {
        Self { conn }
    }

    pub async fn from_ports(self, ports: &[Port]) {
        self.conn.scan(ports.iter().copied()).await;
    }

    /// Re-scan the ports the given handles were seen on.
    pub async fn from_headers(self, headers: &[&InstanceHandle<T>]) {
        let ports: Vec<Port> = headers.iter().filter_map(|h| h.port()).collect();
        self.conn.scan(ports).await;
    }

    pub async fn all_ports(self) {
        self.conn.scan(Port::all()).await;
    }

    pub async fn open_ports(self) {
        let ports = self.conn.open_ports();
        self.conn.scan(ports).await;
    }

    pub async fn closed_ports(self) {
        let ports = self.conn.closed_ports();
        self.conn.scan(ports).await;
    }
}
