//! Orchestrator over every Archicad instance in the port window.
//!
//! `MultiConn` owns the registry of open ports and their handles. All
//! mutation goes through `&mut self`; scans collect probe results
//! concurrently and apply them one at a time as they resolve.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use multiconn_common::Port;
use tracing::{debug, info, warn};

use crate::application::actions::{
    Connect, Disconnect, FindArchicad, OpenProject, QuitAndDisconnect, Refresh, Run,
    SwitchProject,
};
use crate::application::client::ProtocolClient;
use crate::application::handle::{Bootstrap, InstanceHandle};
use crate::application::ports::{DialogHandler, PortLocator, ProcessLauncher, Transport};
use crate::application::surface::CommandSurface;
use crate::bridge;
use crate::domain::{MultiConnConfig, MultiConnError, PrimaryError, Status};

/// What to make primary.
#[derive(Debug, Clone)]
pub enum PrimaryTarget<T> {
    Port(Port),
    /// The registered instance equal to this handle.
    Handle(Box<InstanceHandle<T>>),
}

impl<T> From<Port> for PrimaryTarget<T> {
    fn from(port: Port) -> Self {
        Self::Port(port)
    }
}

impl<T: Clone> From<&InstanceHandle<T>> for PrimaryTarget<T> {
    fn from(handle: &InstanceHandle<T>) -> Self {
        Self::Handle(Box::new(handle.clone()))
    }
}

pub struct MultiConn<T> {
    pub(crate) config: MultiConnConfig,
    pub(crate) transport: T,
    pub(crate) registry: BTreeMap<Port, InstanceHandle<T>>,
    primary: Option<InstanceHandle<T>>,
    pub(crate) launcher: Box<dyn ProcessLauncher>,
    pub(crate) dialog_handler: Box<dyn DialogHandler>,
    pub(crate) port_locator: Arc<dyn PortLocator>,
}

impl<T: Transport> MultiConn<T> {
    /// Empty orchestrator; nothing is probed until `discover` or `scan`.
    pub fn new(
        config: MultiConnConfig,
        transport: T,
        launcher: Box<dyn ProcessLauncher>,
        dialog_handler: Box<dyn DialogHandler>,
        port_locator: Arc<dyn PortLocator>,
    ) -> Self {
        Self {
            config,
            transport,
            registry: BTreeMap::new(),
            primary: None,
            launcher,
            dialog_handler,
            port_locator,
        }
    }

    #[must_use]
    pub fn config(&self) -> &MultiConnConfig {
        &self.config
    }

    // ── Discovery ─────────────────────────────────────────────────────────────

    /// Scan the whole window, then pick the primary.
    ///
    /// # Errors
    ///
    /// Returns `PrimaryError::NotRegistered` when `primary` names a port
    /// with no running instance.
    pub async fn discover(&mut self, primary: Option<Port>) -> Result<(), MultiConnError> {
        self.scan(Port::all()).await;
        self.set_primary(primary.map(PrimaryTarget::Port)).await
    }

    /// Probe `ports` concurrently and update the registry.
    ///
    /// New reachable ports get a bootstrapped handle. Known reachable ports
    /// are bootstrapped again and merged, keeping earlier successes over
    /// fresh failures. Unreachable ports are dropped.
    pub async fn scan(&mut self, ports: impl IntoIterator<Item = Port>) {
        let probe_timeout = self.config.probe_timeout();
        let bootstrap_timeout = self.config.bootstrap_timeout();
        let targets: BTreeSet<Port> = ports.into_iter().collect();
        debug!(count = targets.len(), "scanning ports");

        let mut probes: FuturesUnordered<_> = targets
            .into_iter()
            .map(|port| {
                let client = self.client_for(port);
                async move {
                    if client.probe(probe_timeout).await {
                        (port, Some(Bootstrap::fetch(&client, bootstrap_timeout).await))
                    } else {
                        (port, None)
                    }
                }
            })
            .collect();

        let primary_port = self.primary_port();
        while let Some((port, outcome)) = probes.next().await {
            match outcome {
                Some(fresh) => self.apply_bootstrap(port, fresh),
                None => {
                    if self.registry.remove(&port).is_some() {
                        info!(%port, "instance closed");
                    }
                }
            }
        }

        if let Some(port) = primary_port
            && !self.registry.contains_key(&port)
        {
            self.reselect_primary().await;
        }
    }

    fn apply_bootstrap(&mut self, port: Port, fresh: Bootstrap) {
        if let Some(handle) = self.registry.get_mut(&port) {
            let merged = fresh.merge_over(handle.bootstrap_fields());
            handle.set_bootstrap(merged);
            debug!(%port, "instance refreshed");
        } else {
            let mut handle = InstanceHandle::new(port, self.transport.clone())
                .with_command_timeout(self.config.command_timeout());
            handle.set_bootstrap(fresh);
            self.registry.insert(port, handle);
            info!(%port, "instance found");
        }
    }

    /// Drop `port` from the registry if present.
    pub async fn close_if_open(&mut self, port: Port) {
        if self.registry.remove(&port).is_some() {
            info!(%port, "instance closed");
            if self.primary_port() == Some(port) {
                self.reselect_primary().await;
            }
        }
    }

    pub(crate) fn client_for(&self, port: Port) -> ProtocolClient<T> {
        ProtocolClient::new(self.transport.clone(), port, self.config.command_timeout())
    }

    pub(crate) async fn fresh_handle(&self, port: Port) -> InstanceHandle<T> {
        InstanceHandle::bootstrapped(
            port,
            self.transport.clone(),
            self.config.command_timeout(),
            self.config.bootstrap_timeout(),
        )
        .await
    }

    // ── Primary ───────────────────────────────────────────────────────────────

    /// Choose the primary instance.
    ///
    /// `None` picks the lowest open port, or clears the primary when nothing
    /// is open. The primary is a separate handle, bootstrapped and connected
    /// on its own; the registry entry is left untouched.
    ///
    /// # Errors
    ///
    /// Returns `PrimaryError` when the target is not registered.
    pub async fn set_primary(
        &mut self,
        target: Option<PrimaryTarget<T>>,
    ) -> Result<(), MultiConnError> {
        let port = match target {
            None => {
                self.reselect_primary().await;
                return Ok(());
            }
            Some(PrimaryTarget::Port(port)) => {
                if !self.registry.contains_key(&port) {
                    return Err(PrimaryError::NotRegistered(port).into());
                }
                port
            }
            Some(PrimaryTarget::Handle(handle)) => self
                .registry
                .iter()
                .find(|(_, registered)| registered.same_instance(&handle))
                .map(|(port, _)| *port)
                .ok_or(PrimaryError::HandleNotRegistered)?,
        };
        self.install_primary(port).await;
        Ok(())
    }

    async fn reselect_primary(&mut self) {
        match self.registry.keys().next().copied() {
            Some(port) => self.install_primary(port).await,
            None => {
                if self.primary.take().is_some() {
                    info!("primary cleared");
                }
            }
        }
    }

    async fn install_primary(&mut self, port: Port) {
        let mut handle = self.fresh_handle(port).await;
        if let Err(e) = handle.connect(self.config.bootstrap_timeout()).await {
            warn!(%port, error = %e, "primary connect refused");
        }
        info!(%port, status = %handle.status(), "primary set");
        self.primary = Some(handle);
    }

    #[must_use]
    pub fn primary(&self) -> Option<&InstanceHandle<T>> {
        self.primary.as_ref()
    }

    #[must_use]
    pub fn primary_port(&self) -> Option<Port> {
        self.primary.as_ref().and_then(InstanceHandle::port)
    }

    /// Protocol client of the primary.
    ///
    /// # Errors
    ///
    /// Returns `MultiConnError::NoPrimary` when no primary is set.
    pub fn core(&self) -> Result<&ProtocolClient<T>, MultiConnError> {
        Ok(self.primary.as_ref().ok_or(MultiConnError::NoPrimary)?.core()?)
    }

    /// Command surface of the primary.
    ///
    /// # Errors
    ///
    /// Returns `MultiConnError::NoPrimary` when no primary is set, or the
    /// handle error when the primary failed to connect.
    pub fn standard(&self) -> Result<&CommandSurface<T>, MultiConnError> {
        Ok(self.primary.as_ref().ok_or(MultiConnError::NoPrimary)?.standard()?)
    }

    // ── Blocking twins ────────────────────────────────────────────────────────

    /// [`Self::discover`] for synchronous callers.
    ///
    /// # Errors
    ///
    /// Returns `MultiConnError::Bridge` when called inside a runtime.
    pub fn discover_blocking(&mut self, primary: Option<Port>) -> Result<(), MultiConnError> {
        bridge::block_on(self.discover(primary))?
    }

    /// [`Self::scan`] for synchronous callers.
    ///
    /// # Errors
    ///
    /// Returns `MultiConnError::Bridge` when called inside a runtime.
    pub fn scan_blocking(
        &mut self,
        ports: impl IntoIterator<Item = Port>,
    ) -> Result<(), MultiConnError> {
        Ok(bridge::block_on(self.scan(ports))?)
    }

    /// [`Self::set_primary`] for synchronous callers.
    ///
    /// # Errors
    ///
    /// Same as [`Self::set_primary`], plus `MultiConnError::Bridge` when
    /// called inside a runtime.
    pub fn set_primary_blocking(
        &mut self,
        target: Option<PrimaryTarget<T>>,
    ) -> Result<(), MultiConnError> {
        bridge::block_on(self.set_primary(target))?
    }

    // ── Views ─────────────────────────────────────────────────────────────────

    /// Registered handles in ascending port order.
    pub fn handles(&self) -> impl Iterator<Item = &InstanceHandle<T>> {
        self.registry.values()
    }

    #[must_use]
    pub fn get(&self, port: Port) -> Option<&InstanceHandle<T>> {
        self.registry.get(&port)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    fn with_status(&self, status: Status) -> Vec<&InstanceHandle<T>> {
        self.registry
            .values()
            .filter(|h| h.status() == status)
            .collect()
    }

    #[must_use]
    pub fn pending(&self) -> Vec<&InstanceHandle<T>> {
        self.with_status(Status::Pending)
    }

    #[must_use]
    pub fn active(&self) -> Vec<&InstanceHandle<T>> {
        self.with_status(Status::Active)
    }

    #[must_use]
    pub fn failed(&self) -> Vec<&InstanceHandle<T>> {
        self.with_status(Status::Failed)
    }

    #[must_use]
    pub fn open_ports(&self) -> Vec<Port> {
        self.registry.keys().copied().collect()
    }

    #[must_use]
    pub fn closed_ports(&self) -> Vec<Port> {
        Port::all()
            .filter(|p| !self.registry.contains_key(p))
            .collect()
    }

    #[must_use]
    pub fn all_ports(&self) -> Vec<Port> {
        Port::all().collect()
    }

    // ── Actions ───────────────────────────────────────────────────────────────

    pub fn connect(&mut self) -> Connect<'_, T> {
        Connect::new(self)
    }

    pub fn disconnect(&mut self) -> Disconnect<'_, T> {
        Disconnect::new(self)
    }

    pub fn quit(&mut self) -> QuitAndDisconnect<'_, T> {
        QuitAndDisconnect::new(self)
    }

    pub fn refresh(&mut self) -> Refresh<'_, T> {
        Refresh::new(self)
    }

    #[must_use]
    pub fn find_archicad(&self) -> FindArchicad<'_, T> {
        FindArchicad::new(self)
    }

    pub fn open_project(&mut self) -> OpenProject<'_, T> {
        OpenProject::new(self)
    }

    pub fn switch_project(&mut self) -> SwitchProject<'_, T> {
        SwitchProject::new(self)
    }

    #[must_use]
    pub fn run(&self) -> Run<'_, T> {
        Run::new(self)
    }

    /// Put `handle` on `port`, refreshing the primary if it lives there.
    pub(crate) async fn replace_handle(&mut self, port: Port, handle: InstanceHandle<T>) {
        self.registry.insert(port, handle);
        if self.primary_port() == Some(port) {
            self.install_primary(port).await;
        }
    }

    pub(crate) async fn after_removal(&mut self, removed: &[Port]) {
        if let Some(primary) = self.primary_port()
            && removed.contains(&primary)
        {
            self.reselect_primary().await;
        }
    }
}
