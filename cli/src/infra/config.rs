//! Configuration loading from `MULTICONN_*` environment variables.

use anyhow::{Context, Result};

use crate::domain::MultiConnConfig;

/// Prefix of every configuration variable, e.g. `MULTICONN_PROBE_TIMEOUT_MS`.
pub const ENV_PREFIX: &str = "MULTICONN_";

/// Load and validate configuration from the process environment.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed or a value is invalid.
pub fn load_from_env() -> Result<MultiConnConfig> {
    load_from_vars(std::env::vars())
}

/// Load and validate configuration from explicit `(name, value)` pairs.
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed or a value is invalid.
pub fn load_from_vars<I>(vars: I) -> Result<MultiConnConfig>
where
    I: IntoIterator<Item = (String, String)>,
{
    let config: MultiConnConfig = envy::prefixed(ENV_PREFIX)
        .from_iter(vars)
        .context("failed to load config from MULTICONN_* env vars")?;
    config.validate()?;
    Ok(config)
}
