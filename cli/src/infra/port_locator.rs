//! Port locators: implement `PortLocator`.
//!
//! On Linux the listening sockets of a process are read from `/proc`. Other
//! platforms ask the `listeners` crate for the system socket table. Both
//! only report sockets owned by the requested pid.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::application::ports::PortLocator;

/// TCP state code of a listening socket in `/proc/net/tcp`.
const TCP_LISTEN: &str = "0A";

/// Reads `/proc/<pid>/fd` and `/proc/net/tcp{,6}`.
#[derive(Debug, Clone)]
pub struct ProcNetLocator {
    proc_root: PathBuf,
}

impl Default for ProcNetLocator {
    fn default() -> Self {
        Self::with_root(PathBuf::from("/proc"))
    }
}

impl ProcNetLocator {
    /// Locator reading from an alternative proc mount (used in tests).
    #[must_use]
    pub fn with_root(proc_root: PathBuf) -> Self {
        Self { proc_root }
    }

    fn socket_inodes(&self, pid: u32) -> Result<HashSet<u64>> {
        let fd_dir = self.proc_root.join(pid.to_string()).join("fd");
        let entries = std::fs::read_dir(&fd_dir)
            .with_context(|| format!("reading {}", fd_dir.display()))?;
        Ok(entries
            .filter_map(|entry| std::fs::read_link(entry.ok()?.path()).ok())
            .filter_map(|target| parse_socket_link(&target.to_string_lossy()))
            .collect())
    }
}

impl PortLocator for ProcNetLocator {
    fn listening_ports(&self, pid: u32) -> Result<Vec<u16>> {
        let inodes = self.socket_inodes(pid)?;
        let mut ports = Vec::new();
        for table in ["tcp", "tcp6"] {
            let path = self.proc_root.join("net").join(table);
            // tcp6 is absent when IPv6 is disabled.
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            ports.extend(parse_listening_ports(&content, &inodes));
        }
        ports.sort_unstable();
        ports.dedup();
        Ok(ports)
    }
}

/// `socket:[12345]` → `12345`
fn parse_socket_link(target: &str) -> Option<u64> {
    target
        .strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}

/// Local ports of LISTEN sockets in a `/proc/net/tcp` table whose inode is
/// in `inodes`.
#[must_use]
pub fn parse_listening_ports(table: &str, inodes: &HashSet<u64>) -> Vec<u16> {
    table
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            let local = fields.get(1)?;
            let state = fields.get(3)?;
            let inode: u64 = fields.get(9)?.parse().ok()?;
            if *state != TCP_LISTEN || !inodes.contains(&inode) {
                return None;
            }
            let (_, port_hex) = local.rsplit_once(':')?;
            u16::from_str_radix(port_hex, 16).ok()
        })
        .collect()
}

/// One listening socket as reported by the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListeningSocket {
    pub pid: u32,
    pub port: u16,
}

type Snapshot = dyn Fn() -> Result<Vec<ListeningSocket>> + Send + Sync;

/// Attributes listening sockets to processes through the `listeners` crate,
/// which reads the native socket tables on macOS and Windows.
#[derive(Clone)]
pub struct ListenerLocator {
    snapshot: Arc<Snapshot>,
}

impl Default for ListenerLocator {
    fn default() -> Self {
        Self::with_snapshot(system_listeners)
    }
}

impl std::fmt::Debug for ListenerLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerLocator").finish_non_exhaustive()
    }
}

impl ListenerLocator {
    /// Locator reading sockets from `snapshot` instead of the system.
    #[must_use]
    pub fn with_snapshot(
        snapshot: impl Fn() -> Result<Vec<ListeningSocket>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }
}

impl PortLocator for ListenerLocator {
    fn listening_ports(&self, pid: u32) -> Result<Vec<u16>> {
        let mut ports: Vec<u16> = (self.snapshot)()?
            .into_iter()
            .filter(|socket| socket.pid == pid)
            .map(|socket| socket.port)
            .collect();
        ports.sort_unstable();
        ports.dedup();
        Ok(ports)
    }
}

fn system_listeners() -> Result<Vec<ListeningSocket>> {
    let listeners =
        listeners::get_all().map_err(|e| anyhow::anyhow!("listing listening sockets: {e}"))?;
    Ok(listeners
        .into_iter()
        .map(|listener| ListeningSocket {
            pid: listener.process.pid,
            port: listener.socket.port(),
        })
        .collect())
}

/// The best locator for this platform.
#[must_use]
pub fn platform_locator() -> Arc<dyn PortLocator> {
    #[cfg(target_os = "linux")]
    {
        Arc::new(ProcNetLocator::default())
    }
    #[cfg(not(target_os = "linux"))]
    {
        Arc::new(ListenerLocator::default())
    }
}
