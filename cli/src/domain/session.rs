//! Saved set of instance handles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Handles written by `save` and read back by `open --from`.
///
/// Entries are kept as raw JSON so a single unreadable entry does not make
/// the whole file unusable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub saved_at: DateTime<Utc>,
    pub handles: Vec<Value>,
}

impl SavedSession {
    #[must_use]
    pub fn new(handles: Vec<Value>) -> Self {
        Self {
            saved_at: Utc::now(),
            handles,
        }
    }
}
