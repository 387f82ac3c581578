//! Protocol client for one Archicad endpoint.

use std::time::Duration;

use multiconn_common::envelope::{add_on_parameters, command_body, flatten_add_on, parse_envelope};
use multiconn_common::{ADD_ON_COMMAND, ApiError, CommandResult, Port, TAPIR_NAMESPACE};
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::application::command::Command;
use crate::application::ports::Transport;
use crate::bridge::{self, BridgeError};

/// Sends commands to the instance on `port`.
///
/// Cloning is cheap and clones share the transport. No call is retried.
#[derive(Debug, Clone)]
pub struct ProtocolClient<T> {
    transport: T,
    port: Port,
    default_timeout: Duration,
}

impl<T: Transport> ProtocolClient<T> {
    pub fn new(transport: T, port: Port, default_timeout: Duration) -> Self {
        Self {
            transport,
            port,
            default_timeout,
        }
    }

    #[must_use]
    pub fn port(&self) -> Port {
        self.port
    }

    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    #[must_use]
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Send a native command and return its `result` object.
    pub async fn send(
        &self,
        command: &str,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> CommandResult<Value> {
        let body = command_body(command, parameters);
        let timeout = timeout.unwrap_or(self.default_timeout);
        debug!(port = %self.port, command, ?timeout, "sending command");
        let response = self.transport.post_json(self.port, &body, timeout).await?;
        parse_envelope(response)
    }

    /// Send an add-on command from `namespace` and return the add-on's response.
    pub async fn send_add_on(
        &self,
        namespace: &str,
        name: &str,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> CommandResult<Value> {
        let parameters = add_on_parameters(namespace, name, parameters);
        let result = self.send(ADD_ON_COMMAND, parameters, timeout).await?;
        flatten_add_on(result)
    }

    /// Send a Tapir sub-command.
    pub async fn send_subcommand(
        &self,
        name: &str,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> CommandResult<Value> {
        self.send_add_on(TAPIR_NAMESPACE, name, parameters, timeout)
            .await
    }

    /// Typed call with the default timeout.
    pub async fn execute<C: Command>(&self, params: &C::Params) -> CommandResult<C::Output> {
        self.execute_with::<C>(params, None).await
    }

    /// Typed call with an explicit timeout.
    pub async fn execute_with<C: Command>(
        &self,
        params: &C::Params,
        timeout: Option<Duration>,
    ) -> CommandResult<C::Output> {
        let parameters = serde_json::to_value(params)
            .map_err(|e| ApiError::malformed(format!("{} parameters: {e}", C::NAME)))?;
        let raw = match C::NAMESPACE {
            None => self.send(C::NAME, parameters, timeout).await?,
            Some(namespace) => {
                self.send_add_on(namespace, C::NAME, parameters, timeout)
                    .await?
            }
        };
        C::decode(raw)
    }

    /// Whether the endpoint answers at all.
    pub async fn probe(&self, timeout: Duration) -> bool {
        self.transport.probe(self.port, timeout).await
    }

    // ── Blocking and spawned twins ────────────────────────────────────────────

    pub fn send_blocking(
        &self,
        command: &str,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> Result<CommandResult<Value>, BridgeError> {
        bridge::block_on(self.send(command, parameters, timeout))
    }

    pub fn send_subcommand_blocking(
        &self,
        name: &str,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> Result<CommandResult<Value>, BridgeError> {
        bridge::block_on(self.send_subcommand(name, parameters, timeout))
    }

    pub fn spawn_send(
        &self,
        command: impl Into<String>,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> Result<JoinHandle<CommandResult<Value>>, BridgeError> {
        let client = self.clone();
        let command = command.into();
        bridge::spawn(async move { client.send(&command, parameters, timeout).await })
    }

    pub fn spawn_subcommand(
        &self,
        name: impl Into<String>,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> Result<JoinHandle<CommandResult<Value>>, BridgeError> {
        let client = self.clone();
        let name = name.into();
        bridge::spawn(async move { client.send_subcommand(&name, parameters, timeout).await })
    }
}
