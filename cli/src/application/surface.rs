//! Command surface bound to one product version.

use std::time::Duration;

use multiconn_common::{ApiError, CommandResult, Port, ProductInfo};
use serde_json::Value;

use crate::application::client::ProtocolClient;
use crate::application::command::Command;
use crate::application::ports::Transport;

/// What a connected handle exposes: the client plus the product version it
/// was bound against. Typed commands newer than that version are refused
/// locally with code `-4` instead of being sent.
#[derive(Debug, Clone)]
pub struct CommandSurface<T> {
    client: ProtocolClient<T>,
    product: ProductInfo,
}

impl<T: Transport> CommandSurface<T> {
    #[must_use]
    pub fn bind(client: ProtocolClient<T>, product: ProductInfo) -> Self {
        Self { client, product }
    }

    #[must_use]
    pub fn port(&self) -> Port {
        self.client.port()
    }

    #[must_use]
    pub fn product(&self) -> &ProductInfo {
        &self.product
    }

    #[must_use]
    pub fn client(&self) -> &ProtocolClient<T> {
        &self.client
    }

    #[must_use]
    pub fn supports<C: Command>(&self) -> bool {
        self.product.version >= C::SINCE_VERSION
    }

    pub async fn execute<C: Command>(&self, params: &C::Params) -> CommandResult<C::Output> {
        if !self.supports::<C>() {
            return Err(ApiError::unsupported(format!(
                "{} requires Archicad {} or newer, connected to {}",
                C::NAME,
                C::SINCE_VERSION,
                self.product.version
            )));
        }
        self.client.execute::<C>(params).await
    }

    /// Untyped native command; no version check.
    pub async fn send(
        &self,
        command: &str,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> CommandResult<Value> {
        self.client.send(command, parameters, timeout).await
    }

    /// Untyped Tapir sub-command; no version check.
    pub async fn send_subcommand(
        &self,
        name: &str,
        parameters: Value,
        timeout: Option<Duration>,
    ) -> CommandResult<Value> {
        self.client.send_subcommand(name, parameters, timeout).await
    }

    /// Rebind to another endpoint keeping the product version.
    #[must_use]
    pub fn rebind(&self, client: ProtocolClient<T>) -> Self {
        Self::bind(client, self.product.clone())
    }
}
