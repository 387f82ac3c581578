//! Process launcher: implements `ProcessLauncher` with `std::process`.

use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::application::ports::{ProcessLauncher, SpawnedProcess};

/// Starts Archicad detached from this process.
///
/// Arguments are passed to the executable directly, never through a shell,
/// so paths with spaces need no escaping. The child is reaped on a background
/// thread once it exits.
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedLauncher;

impl ProcessLauncher for DetachedLauncher {
    fn launch(&self, program: &str, args: &[String]) -> Result<SpawnedProcess> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;
        let pid = child.id();
        info!(pid, program, "process started");

        // Archicad outlives this call; reap it whenever it exits.
        std::thread::Builder::new()
            .name(format!("reap-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) => debug!(pid, %status, "process exited"),
                Err(e) => debug!(pid, error = %e, "waiting for process failed"),
            })
            .context("starting reaper thread")?;

        Ok(SpawnedProcess {
            pid,
            program: program.to_string(),
            args: args.to_vec(),
        })
    }
}
