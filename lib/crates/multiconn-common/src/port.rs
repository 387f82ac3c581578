use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest port an Archicad instance listens on.
pub const PORT_MIN: u16 = 19723;
/// Highest port an Archicad instance listens on.
pub const PORT_MAX: u16 = 19744;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("Port value must be between 19723 and 19744, got {0}.")]
    OutOfRange(u16),

    #[error("Invalid port number: {0}")]
    Invalid(String),
}

/// A local Archicad JSON endpoint port, always inside `PORT_MIN..=PORT_MAX`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Validate and wrap a port number.
    ///
    /// # Errors
    ///
    /// Returns `PortError::OutOfRange` when `value` lies outside the window.
    pub fn new(value: u16) -> Result<Self, PortError> {
        if Self::in_range(value) {
            Ok(Self(value))
        } else {
            Err(PortError::OutOfRange(value))
        }
    }

    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }

    #[must_use]
    pub const fn in_range(value: u16) -> bool {
        value >= PORT_MIN && value <= PORT_MAX
    }

    /// Every port of the window, ascending.
    pub fn all() -> impl DoubleEndedIterator<Item = Port> + Clone {
        (PORT_MIN..=PORT_MAX).map(Port)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

impl FromStr for Port {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u16 = s
            .trim()
            .parse()
            .map_err(|_| PortError::Invalid(s.to_string()))?;
        Self::new(value)
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
