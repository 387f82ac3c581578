//! `multiconn run`: send a raw command to one or every instance.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use clap::Args;
use multiconn_common::{ApiError, CommandResult, Port};
use serde_json::Value;

use crate::application::{InstanceHandle, MultiConn, PrimaryTarget, Transport};
use crate::output::human::HumanRenderer;
use crate::output::{OutputContext, json};

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Command name, e.g. `API.GetProductInfo` or a Tapir command with `--addon`
    pub command: String,

    /// Command parameters as a JSON object
    #[arg(long, default_value = "{}")]
    pub params: String,

    /// Send as a Tapir add-on command
    #[arg(long)]
    pub addon: bool,

    /// Only run on this instance
    #[arg(long)]
    pub port: Option<Port>,
}

/// A parsed raw request.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub command: String,
    pub params: Value,
    pub addon: bool,
}

impl RawRequest {
    /// # Errors
    ///
    /// Returns an error if `--params` is not a JSON object.
    pub fn from_args(args: &RunArgs) -> Result<Self> {
        let params: Value =
            serde_json::from_str(&args.params).context("--params is not valid JSON")?;
        if !params.is_object() {
            anyhow::bail!("--params must be a JSON object");
        }
        Ok(Self {
            command: args.command.clone(),
            params,
            addon: args.addon,
        })
    }

    /// Send the request through `handle`'s protocol client.
    pub async fn send<T: Transport>(self, handle: InstanceHandle<T>) -> CommandResult<Value> {
        let client = handle
            .core()
            .map_err(|e| ApiError::connection(e.to_string()))?;
        if self.addon {
            client.send_subcommand(&self.command, self.params, None).await
        } else {
            client.send(&self.command, self.params, None).await
        }
    }
}

/// Run `multiconn run <COMMAND> [--params <JSON>] [--addon] [--port <PORT>]`.
///
/// # Errors
///
/// Returns an error if the parameters are invalid, `--port` names no running
/// instance, or the command failed on every targeted instance.
pub async fn run<T: Transport>(
    ctx: &OutputContext,
    conn: &mut MultiConn<T>,
    args: &RunArgs,
    as_json: bool,
) -> Result<()> {
    let request = RawRequest::from_args(args)?;
    conn.scan(Port::all()).await;

    let results: BTreeMap<Port, CommandResult<Value>> = if let Some(port) = args.port {
        conn.set_primary(Some(PrimaryTarget::Port(port))).await?;
        let result = conn.run().single(|h| request.clone().send(h)).await?;
        BTreeMap::from([(port, result)])
    } else {
        conn.connect().all().await;
        conn.run()
            .multi_concurrent(|h| request.clone().send(h))
            .await
            .into_inner()
    };

    if as_json {
        let document: BTreeMap<String, Value> = results
            .iter()
            .map(|(port, result)| {
                let value = match result {
                    Ok(value) => serde_json::json!({ "result": value }),
                    Err(err) => serde_json::json!({ "error": err }),
                };
                (port.to_string(), value)
            })
            .collect();
        json::print(&document)?;
    } else {
        HumanRenderer::new(ctx).render_results(&results);
    }

    if !results.is_empty() && results.values().all(Result::is_err) {
        anyhow::bail!("{} failed on every instance", request.command);
    }
    Ok(())
}
