//! HTTP transport: implements `Transport` with `reqwest`.

use std::time::Duration;

use anyhow::{Context, Result};
use multiconn_common::{ApiError, CommandResult, Port};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::application::ports::Transport;
use crate::domain::config::DEFAULT_HOST;

/// Production transport talking to `<host>:<port>` over HTTP.
///
/// Cloning shares the connection pool.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    host: String,
}

impl HttpTransport {
    /// Transport for endpoints on `host`, e.g. `http://127.0.0.1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend
    /// initialisation).
    pub fn new(host: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            host: host.into().trim_end_matches('/').to_string(),
        })
    }

    /// Transport for the local machine.
    ///
    /// # Errors
    ///
    /// Same as [`Self::new`].
    pub fn localhost() -> Result<Self> {
        Self::new(DEFAULT_HOST)
    }

    #[must_use]
    pub fn url(&self, port: Port) -> String {
        format!("{}:{port}", self.host)
    }
}

impl Transport for HttpTransport {
    async fn post_json(&self, port: Port, body: &Value, timeout: Duration) -> CommandResult<Value> {
        let url = self.url(port);
        let response = self
            .client
            .post(&url)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| request_error(&url, &e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(&url, status));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::malformed(format!("invalid JSON from {url}: {e}")))
    }

    async fn probe(&self, port: Port, timeout: Duration) -> bool {
        let url = self.url(port);
        match self.client.get(&url).timeout(timeout).send().await {
            Ok(response) => response.status() == StatusCode::OK,
            Err(e) => {
                debug!(%port, error = %e, "probe failed");
                false
            }
        }
    }
}

fn request_error(url: &str, err: &reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::timeout(format!("request to {url} timed out"))
    } else if err.is_decode() || err.is_body() {
        ApiError::malformed(format!("bad response from {url}: {err}"))
    } else {
        ApiError::connection(format!("cannot reach {url}: {err}"))
    }
}

fn status_error(url: &str, status: StatusCode) -> ApiError {
    ApiError::new(
        i64::from(status.as_u16()),
        format!(
            "HTTP {} from {url}",
            status.canonical_reason().map_or_else(
                || status.as_u16().to_string(),
                |reason| format!("{} {reason}", status.as_u16())
            )
        ),
    )
}
