//! Lifecycle status of an instance handle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Where a handle sits in its lifecycle.
///
/// `Pending → Active | Failed`, `Failed → Active | Failed`,
/// `Active → Pending`, any state `→ Unassigned`. Nothing leaves `Unassigned`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Active,
    Failed,
    Unassigned,
}

impl Status {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Failed => "failed",
            Self::Unassigned => "unassigned",
        }
    }

    /// Whether a handle in this state may still be (re)connected.
    #[must_use]
    pub fn is_assignable(self) -> bool {
        self != Self::Unassigned
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
