//! Finding, opening and switching projects.

use std::collections::BTreeSet;
use std::sync::Arc;

use multiconn_common::{ArchicadId, IdentityError, Port, TeamworkCredentials};
use tracing::{debug, info, warn};

use crate::application::command::{OpenProjectFile, ProjectFile};
use crate::application::handle::InstanceHandle;
use crate::application::multi_conn::MultiConn;
use crate::application::ports::{PortLocator, SpawnedProcess, Transport};
use crate::domain::ProjectError;

// ── Find ──────────────────────────────────────────────────────────────────────

pub struct FindArchicad<'a, T> {
    conn: &'a MultiConn<T>,
}

impl<'a, T: Transport> FindArchicad<'a, T> {
    pub(crate) fn new(conn: &'a MultiConn<T>) -> Self {
        Self { conn }
    }

    /// Port of the registered instance equal to `header`, if any.
    ///
    /// Always `None` for a header that is not fully initialized.
    #[must_use]
    pub fn from_header(&self, header: &InstanceHandle<T>) -> Option<Port> {
        if !header.is_fully_initialized() {
            return None;
        }
        self.conn
            .registry
            .iter()
            .find(|(_, registered)| registered.same_instance(header))
            .map(|(port, _)| *port)
    }
}

// ── Open ──────────────────────────────────────────────────────────────────────

/// Launch Archicad with the project a handle describes and register the
/// new instance.
pub struct OpenProject<'a, T> {
    conn: &'a mut MultiConn<T>,
}

impl<'a, T: Transport> OpenProject<'a, T> {
    pub(crate) fn new(conn: &'a mut MultiConn<T>) -> Self {
        Self { conn }
    }

    /// # Errors
    ///
    /// See [`ProjectError`]: precondition failures are reported before
    /// anything is launched.
    pub async fn from_header(
        self,
        header: &InstanceHandle<T>,
        demo: bool,
    ) -> Result<Port, ProjectError> {
        self.open(header, None, demo).await
    }

    /// Like [`Self::from_header`], logging into teamwork with `credentials`
    /// instead of the stored ones.
    ///
    /// # Errors
    ///
    /// See [`ProjectError`].
    pub async fn with_teamwork_credentials(
        self,
        header: &InstanceHandle<T>,
        credentials: &TeamworkCredentials,
        demo: bool,
    ) -> Result<Port, ProjectError> {
        self.open(header, Some(credentials), demo).await
    }

    async fn open(
        self,
        header: &InstanceHandle<T>,
        credentials: Option<&TeamworkCredentials>,
        demo: bool,
    ) -> Result<Port, ProjectError> {
        let project_location = checked_location(&*self.conn, header, credentials)?;
        let Ok(id) = header.archicad_id() else {
            return Err(ProjectError::NotFullyInitialized);
        };
        let Ok(location) = header.archicad_location() else {
            return Err(ProjectError::NotFullyInitialized);
        };

        let program = location.archicad_location.clone();
        let mut args = vec![project_location];
        if demo {
            args.push("-demo".to_string());
        }
        info!(project = id.project_name(), %program, "opening project");
        let process = self
            .conn
            .launcher
            .launch(&program, &args)
            .map_err(|e| ProjectError::Launch {
                program: program.clone(),
                reason: format!("{e:#}"),
            })?;
        self.conn
            .dialog_handler
            .start(&process)
            .map_err(|e| ProjectError::DialogHandler {
                pid: process.pid,
                reason: format!("{e:#}"),
            })?;

        let port = self.wait_for_port(&process).await?;
        let handle = self.conn.fresh_handle(port).await;
        self.conn.registry.insert(port, handle);
        info!(
            project = id.project_name(),
            %port,
            pid = process.pid,
            "project opened"
        );
        Ok(port)
    }

    /// Poll the launched process until it listens on an unregistered port of
    /// the window.
    async fn wait_for_port(&self, process: &SpawnedProcess) -> Result<Port, ProjectError> {
        let interval = self.conn.config.open_poll_interval();
        let attempts = self.conn.config.open_max_polls;
        let pid = process.pid;
        for attempt in 1..=attempts {
            let known: BTreeSet<Port> = self.conn.registry.keys().copied().collect();
            match listening_ports(Arc::clone(&self.conn.port_locator), pid).await {
                Ok(ports) => {
                    if let Some(port) = ports
                        .into_iter()
                        .filter_map(|p| Port::new(p).ok())
                        .filter(|p| !known.contains(p))
                        .min()
                    {
                        debug!(pid, %port, "archicad listening");
                        return Ok(port);
                    }
                }
                Err(e) => debug!(pid, attempt, error = %format!("{e:#}"), "port lookup failed"),
            }
            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }
        warn!(pid, attempts, "archicad never opened a port");
        Err(ProjectError::PortNotFound { pid, attempts })
    }
}

/// Where `header`'s project lives, once it is known to be openable and not
/// open anywhere yet.
fn checked_location<T: Transport>(
    conn: &MultiConn<T>,
    header: &InstanceHandle<T>,
    credentials: Option<&TeamworkCredentials>,
) -> Result<String, ProjectError> {
    if !header.is_fully_initialized() {
        return Err(ProjectError::NotFullyInitialized);
    }
    let Ok(id) = header.archicad_id() else {
        return Err(ProjectError::NotFullyInitialized);
    };
    if matches!(id, ArchicadId::Untitled { .. }) {
        return Err(ProjectError::UntitledProject);
    }
    let project_location = id
        .project_location(credentials)
        .map_err(|e| match e {
            IdentityError::MissingPassword => ProjectError::MissingPassword,
            other => ProjectError::Identity(other),
        })?
        .ok_or(ProjectError::UntitledProject)?;
    if let Some(port) = FindArchicad::new(conn).from_header(header) {
        return Err(ProjectError::AlreadyOpen(port));
    }
    Ok(project_location)
}

// ── Switch ────────────────────────────────────────────────────────────────────

/// Open another project inside an already running instance.
///
/// The instance keeps its port; its registry handle is replaced by a freshly
/// bootstrapped one describing the new project.
pub struct SwitchProject<'a, T> {
    conn: &'a mut MultiConn<T>,
}

impl<'a, T: Transport> SwitchProject<'a, T> {
    pub(crate) fn new(conn: &'a mut MultiConn<T>) -> Self {
        Self { conn }
    }

    /// Open the project file at `project_path` in the instance on `port`.
    ///
    /// # Errors
    ///
    /// `ProjectError::NotOpen` when nothing is registered on `port`,
    /// `ProjectError::SwitchFailed` when Archicad refuses the command.
    pub async fn from_path(
        self,
        port: Port,
        project_path: &str,
    ) -> Result<InstanceHandle<T>, ProjectError> {
        self.switch(port, project_path.to_string()).await
    }

    /// Open the project `header` describes in the instance on `port`.
    ///
    /// # Errors
    ///
    /// The precondition errors of [`OpenProject::from_header`], plus those
    /// of [`Self::from_path`].
    pub async fn from_header(
        self,
        port: Port,
        header: &InstanceHandle<T>,
    ) -> Result<InstanceHandle<T>, ProjectError> {
        let project_location = checked_location(&*self.conn, header, None)?;
        self.switch(port, project_location).await
    }

    async fn switch(
        self,
        port: Port,
        project_file_path: String,
    ) -> Result<InstanceHandle<T>, ProjectError> {
        if !self.conn.registry.contains_key(&port) {
            return Err(ProjectError::NotOpen(port));
        }
        let client = self.conn.client_for(port);
        client
            .execute::<OpenProjectFile>(&ProjectFile { project_file_path })
            .await
            .map_err(|error| {
                warn!(%port, code = error.code, message = %error.message, "switch failed");
                ProjectError::SwitchFailed { port, error }
            })?;

        let handle = self.conn.fresh_handle(port).await;
        self.conn.replace_handle(port, handle.clone()).await;
        info!(
            %port,
            project = handle.archicad_id().as_ref().map_or("?", ArchicadId::project_name),
            "project switched"
        );
        Ok(handle)
    }
}

async fn listening_ports(locator: Arc<dyn PortLocator>, pid: u32) -> anyhow::Result<Vec<u16>> {
    tokio::task::spawn_blocking(move || locator.listening_ports(pid))
        .await
        .map_err(|e| anyhow::anyhow!("port lookup task panicked: {e}"))?
}
