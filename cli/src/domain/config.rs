//! Domain types and validators for multiconn configuration.
//!
//! Pure functions only: no I/O and no async.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;

// ── Defaults ─────────────────────────────────────────────────────────────────

pub const DEFAULT_HOST: &str = "http://127.0.0.1";
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 200;
pub const DEFAULT_BOOTSTRAP_TIMEOUT_MS: u64 = 200;
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_OPEN_POLL_INTERVAL_MS: u64 = 1_000;
pub const DEFAULT_OPEN_MAX_POLLS: u32 = 300;

// ── Config schema ────────────────────────────────────────────────────────────

/// Orchestrator settings. Every field has a default so a partial source
/// (environment, file, flags) is always enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiConnConfig {
    /// Scheme and host of the Archicad endpoints, without port.
    pub host: String,
    /// Timeout of a single liveness probe.
    pub probe_timeout_ms: u64,
    /// Timeout of each bootstrap command.
    pub bootstrap_timeout_ms: u64,
    /// Timeout of regular commands.
    pub command_timeout_ms: u64,
    /// Delay between port lookups after launching Archicad.
    pub open_poll_interval_ms: u64,
    /// Number of port lookups before giving up on a launched Archicad.
    pub open_max_polls: u32,
}

impl Default for MultiConnConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
            bootstrap_timeout_ms: DEFAULT_BOOTSTRAP_TIMEOUT_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            open_poll_interval_ms: DEFAULT_OPEN_POLL_INTERVAL_MS,
            open_max_polls: DEFAULT_OPEN_MAX_POLLS,
        }
    }
}

impl MultiConnConfig {
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    #[must_use]
    pub fn bootstrap_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap_timeout_ms)
    }

    #[must_use]
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    #[must_use]
    pub fn open_poll_interval(&self) -> Duration {
        Duration::from_millis(self.open_poll_interval_ms)
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_host(&self.host)?;
        for (key, value) in [
            ("probe_timeout_ms", self.probe_timeout_ms),
            ("bootstrap_timeout_ms", self.bootstrap_timeout_ms),
            ("command_timeout_ms", self.command_timeout_ms),
            ("open_poll_interval_ms", self.open_poll_interval_ms),
            ("open_max_polls", u64::from(self.open_max_polls)),
        ] {
            if value == 0 {
                return Err(invalid(key, "must be greater than zero"));
            }
        }
        Ok(())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates an endpoint host such as `http://127.0.0.1`.
///
/// # Errors
///
/// Returns an error when the scheme is not http(s), nothing follows it, or a
/// port or path is included.
pub fn validate_host(host: &str) -> Result<(), ConfigError> {
    let rest = host
        .strip_prefix("http://")
        .or_else(|| host.strip_prefix("https://"))
        .ok_or_else(|| invalid("host", "must start with http:// or https://"))?;
    if rest.is_empty() {
        return Err(invalid("host", "missing host name"));
    }
    if rest.contains('/') {
        return Err(invalid("host", "must not contain a path"));
    }
    if rest.rsplit_once(':').is_some_and(|(_, p)| p.chars().all(|c| c.is_ascii_digit())) {
        return Err(invalid("host", "must not contain a port"));
    }
    Ok(())
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
