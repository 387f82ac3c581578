//! Instance handle: one Archicad instance as seen from this process.
//!
//! A handle carries three independently fetched bootstrap fields (product
//! info, project identity, executable location), each either a value or the
//! failure record of the call that produced it, plus the lifecycle status.

use std::fmt;
use std::time::Duration;

use multiconn_common::{
    ApiError, ArchicadId, ArchicadLocation, CommandResult, Port, ProductInfo,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::application::client::ProtocolClient;
use crate::application::command::{GetArchicadLocation, GetProductInfo, GetProjectInfo, NoParams};
use crate::application::ports::Transport;
use crate::application::surface::CommandSurface;
use crate::domain::config::DEFAULT_COMMAND_TIMEOUT_MS;
use crate::domain::{HandleError, Status};

// ── Bootstrap fields ──────────────────────────────────────────────────────────

/// Results of the three bootstrap calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    pub product_info: CommandResult<ProductInfo>,
    pub archicad_id: CommandResult<ArchicadId>,
    pub archicad_location: CommandResult<ArchicadLocation>,
}

impl Bootstrap {
    #[must_use]
    pub fn not_fetched() -> Self {
        Self {
            product_info: Err(ApiError::not_fetched()),
            archicad_id: Err(ApiError::not_fetched()),
            archicad_location: Err(ApiError::not_fetched()),
        }
    }

    /// Issue the three calls concurrently, each bounded by `timeout`.
    pub async fn fetch<T: Transport>(client: &ProtocolClient<T>, timeout: Duration) -> Self {
        let timeout = Some(timeout);
        let (product_info, archicad_id, archicad_location) = tokio::join!(
            client.execute_with::<GetProductInfo>(&NoParams {}, timeout),
            client.execute_with::<GetProjectInfo>(&NoParams {}, timeout),
            client.execute_with::<GetArchicadLocation>(&NoParams {}, timeout),
        );
        let fetched = Self {
            product_info,
            archicad_id,
            archicad_location,
        };
        fetched.log_failures(client.port());
        fetched
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.product_info.is_ok() && self.archicad_id.is_ok() && self.archicad_location.is_ok()
    }

    /// Field-wise merge where a previous success survives a fresh failure.
    #[must_use]
    pub fn merge_over(self, previous: &Self) -> Self {
        fn pick<V: Clone>(fresh: CommandResult<V>, old: &CommandResult<V>) -> CommandResult<V> {
            match (fresh, old) {
                (Err(_), Ok(kept)) => Ok(kept.clone()),
                (fresh, _) => fresh,
            }
        }
        Self {
            product_info: pick(self.product_info, &previous.product_info),
            archicad_id: pick(self.archicad_id, &previous.archicad_id),
            archicad_location: pick(self.archicad_location, &previous.archicad_location),
        }
    }

    fn log_failures(&self, port: Port) {
        for (field, result) in [
            ("productInfo", self.product_info.as_ref().err()),
            ("archicadId", self.archicad_id.as_ref().err()),
            ("archicadLocation", self.archicad_location.as_ref().err()),
        ] {
            if let Some(err) = result {
                warn!(%port, field, code = err.code, message = %err.message, "bootstrap call failed");
            }
        }
    }
}

// ── Handle ────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct InstanceHandle<T> {
    port: Option<Port>,
    status: Status,
    bootstrap: Bootstrap,
    client: Option<ProtocolClient<T>>,
    surface: Option<CommandSurface<T>>,
    transport: T,
    command_timeout: Duration,
}

impl<T: Transport> InstanceHandle<T> {
    /// A pending handle whose bootstrap fields are not fetched yet.
    pub fn new(port: Port, transport: T) -> Self {
        let command_timeout = Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS);
        Self {
            port: Some(port),
            status: Status::Pending,
            bootstrap: Bootstrap::not_fetched(),
            client: Some(ProtocolClient::new(transport.clone(), port, command_timeout)),
            surface: None,
            transport,
            command_timeout,
        }
    }

    /// Default timeout of commands sent through this handle.
    #[must_use]
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self.client = self
            .port
            .map(|port| ProtocolClient::new(self.transport.clone(), port, timeout));
        self
    }

    /// `new` followed by `bootstrap`.
    pub async fn bootstrapped(
        port: Port,
        transport: T,
        command_timeout: Duration,
        bootstrap_timeout: Duration,
    ) -> Self {
        let mut handle = Self::new(port, transport).with_command_timeout(command_timeout);
        handle.bootstrap(bootstrap_timeout).await;
        handle
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Fetch all three bootstrap fields, replacing the stored ones.
    ///
    /// Does nothing on a handle without a client.
    pub async fn bootstrap(&mut self, timeout: Duration) {
        let Some(client) = self.client.clone() else {
            return;
        };
        self.bootstrap = Bootstrap::fetch(&client, timeout).await;
    }

    /// Bind the command surface.
    ///
    /// Product info is fetched again first if it is missing. Ends `Active`
    /// when product info is usable, `Failed` otherwise.
    ///
    /// # Errors
    ///
    /// Returns `HandleError::Unassigned` for an unassigned handle.
    pub async fn connect(&mut self, timeout: Duration) -> Result<Status, HandleError> {
        if !self.status.is_assignable() {
            return Err(HandleError::Unassigned);
        }
        let client = self.client.clone().ok_or(HandleError::Unassigned)?;
        if self.bootstrap.product_info.is_err() {
            self.bootstrap.product_info = client
                .execute_with::<GetProductInfo>(&NoParams {}, Some(timeout))
                .await;
        }
        match &self.bootstrap.product_info {
            Ok(product) => {
                self.surface = Some(CommandSurface::bind(client, product.clone()));
                self.status = Status::Active;
                info!(port = %self.port_label(), version = product.version, "connected");
            }
            Err(err) => {
                self.surface = None;
                self.status = Status::Failed;
                warn!(port = %self.port_label(), code = err.code, message = %err.message, "connect failed");
            }
        }
        Ok(self.status)
    }

    /// Drop the command surface and go back to `Pending`.
    ///
    /// # Errors
    ///
    /// Returns `HandleError::Unassigned` for an unassigned handle.
    pub fn disconnect(&mut self) -> Result<(), HandleError> {
        if !self.status.is_assignable() {
            return Err(HandleError::Unassigned);
        }
        self.surface = None;
        self.status = Status::Pending;
        info!(port = %self.port_label(), "disconnected");
        Ok(())
    }

    /// Detach from any port. Terminal.
    pub fn unassign(&mut self) {
        debug!(port = %self.port_label(), "unassigned");
        self.surface = None;
        self.client = None;
        self.port = None;
        self.status = Status::Unassigned;
    }

    /// Move the handle to another port, or unassign it with `None`.
    ///
    /// An active handle stays active against the new port.
    pub fn set_port(&mut self, port: Option<Port>) {
        let Some(port) = port else {
            self.unassign();
            return;
        };
        let client = ProtocolClient::new(self.transport.clone(), port, self.command_timeout);
        if self.status == Status::Active {
            self.surface = self.surface.as_ref().map(|s| s.rebind(client.clone()));
        }
        self.client = Some(client);
        self.port = Some(port);
    }

    pub(crate) fn set_bootstrap(&mut self, bootstrap: Bootstrap) {
        self.bootstrap = bootstrap;
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn port(&self) -> Option<Port> {
        self.port
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.status
    }

    #[must_use]
    pub fn bootstrap_fields(&self) -> &Bootstrap {
        &self.bootstrap
    }

    #[must_use]
    pub fn product_info(&self) -> &CommandResult<ProductInfo> {
        &self.bootstrap.product_info
    }

    #[must_use]
    pub fn archicad_id(&self) -> &CommandResult<ArchicadId> {
        &self.bootstrap.archicad_id
    }

    #[must_use]
    pub fn archicad_location(&self) -> &CommandResult<ArchicadLocation> {
        &self.bootstrap.archicad_location
    }

    #[must_use]
    pub fn is_fully_initialized(&self) -> bool {
        self.bootstrap.is_complete()
    }

    #[must_use]
    pub fn is_product_info_initialized(&self) -> bool {
        self.bootstrap.product_info.is_ok()
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The raw protocol client.
    ///
    /// # Errors
    ///
    /// Returns `HandleError::Unassigned` when the handle has no port.
    pub fn core(&self) -> Result<&ProtocolClient<T>, HandleError> {
        self.client.as_ref().ok_or(HandleError::Unassigned)
    }

    /// The bound command surface.
    ///
    /// # Errors
    ///
    /// Returns `HandleError::NotConnected` unless the handle is active.
    pub fn standard(&self) -> Result<&CommandSurface<T>, HandleError> {
        self.surface
            .as_ref()
            .ok_or(HandleError::NotConnected(self.port))
    }

    /// Equality of two fully initialized handles; the port is ignored.
    #[must_use]
    pub fn same_instance(&self, other: &Self) -> bool {
        self.is_fully_initialized()
            && other.is_fully_initialized()
            && self.bootstrap == other.bootstrap
    }

    fn port_label(&self) -> String {
        self.port.map_or_else(|| "-".to_string(), |p| p.to_string())
    }

    // ── Serialization ─────────────────────────────────────────────────────────

    /// `{"port", "productInfo", "archicadId", "archicadLocation"}`; failed
    /// fields appear as their `{code, message}` record.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "port": self.port,
            "productInfo": field_json(&self.bootstrap.product_info),
            "archicadId": field_json(&self.bootstrap.archicad_id),
            "archicadLocation": field_json(&self.bootstrap.archicad_location),
        })
    }

    /// Rebuild a handle saved with [`Self::to_json`].
    ///
    /// The result is `Unassigned`; its port is kept for reference only.
    ///
    /// # Errors
    ///
    /// Returns the decoding error when `value` does not have the saved shape.
    pub fn from_json(value: Value, transport: T) -> Result<Self, serde_json::Error> {
        let record: HandleRecord = serde_json::from_value(value)?;
        let command_timeout = Duration::from_millis(DEFAULT_COMMAND_TIMEOUT_MS);
        Ok(Self {
            port: record.port,
            status: Status::Unassigned,
            bootstrap: Bootstrap {
                product_info: record.product_info.into_result(),
                archicad_id: record.archicad_id.into_result(),
                archicad_location: record.archicad_location.into_result(),
            },
            client: record
                .port
                .map(|port| ProtocolClient::new(transport.clone(), port, command_timeout)),
            surface: None,
            transport,
            command_timeout,
        })
    }
}

impl<T: Transport> PartialEq for InstanceHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl<T> fmt::Debug for InstanceHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InstanceHandle")
            .field("port", &self.port)
            .field("status", &self.status)
            .field("product_info", &self.bootstrap.product_info)
            .field("archicad_id", &self.bootstrap.archicad_id)
            .field("archicad_location", &self.bootstrap.archicad_location)
            .finish_non_exhaustive()
    }
}

fn field_json<V: serde::Serialize>(field: &CommandResult<V>) -> Value {
    match field {
        Ok(value) => serde_json::to_value(value),
        Err(err) => serde_json::to_value(err),
    }
    .unwrap_or_default()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HandleRecord {
    port: Option<Port>,
    product_info: FieldRecord<ProductInfo>,
    archicad_id: FieldRecord<ArchicadId>,
    archicad_location: FieldRecord<ArchicadLocation>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FieldRecord<V> {
    Value(V),
    Failure(ApiError),
}

impl<V> FieldRecord<V> {
    fn into_result(self) -> CommandResult<V> {
        match self {
            Self::Value(v) => Ok(v),
            Self::Failure(e) => Err(e),
        }
    }
}
