//! Infrastructure implementation of the `HandleStore` port.
//!
//! `JsonHandleStore` provides async load/save using `tokio::task::spawn_blocking`
//! with atomic write (temp file + rename) so a crash never leaves a half
//! written file behind.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::application::ports::HandleStore;
use crate::domain::SavedSession;

/// Environment variable overriding the default store location.
pub const STORE_PATH_ENV: &str = "MULTICONN_STORE";

/// Saved handle file manager.
#[derive(Debug, Clone)]
pub struct JsonHandleStore {
    path: PathBuf,
}

impl JsonHandleStore {
    /// Create a store using `$MULTICONN_STORE` or `~/.multiconn/handles.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new() -> Result<Self> {
        if let Ok(path) = std::env::var(STORE_PATH_ENV) {
            return Ok(Self::with_path(PathBuf::from(path)));
        }
        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
        Ok(Self::with_path(home.join(".multiconn").join("handles.json")))
    }

    /// Create a store with an explicit path.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_sync(&self) -> Result<Option<SavedSession>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading handle file {}", self.path.display()))?;
        let session: SavedSession = serde_json::from_str(&content)
            .with_context(|| format!("parsing handle file {}", self.path.display()))?;
        Ok(Some(session))
    }

    fn save_sync(&self, session: &SavedSession) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(session).context("serializing handles")?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, &content)
            .with_context(|| format!("writing temp file {}", temp_path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))
                .with_context(|| format!("setting permissions on {}", temp_path.display()))?;
        }

        std::fs::rename(&temp_path, &self.path)
            .with_context(|| format!("finalizing handle file {}", self.path.display()))?;

        Ok(())
    }
}

impl HandleStore for JsonHandleStore {
    async fn load_async(&self) -> Result<Option<SavedSession>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.load_sync())
            .await
            .context("handle load task panicked")?
    }

    async fn save_async(&self, session: &SavedSession) -> Result<()> {
        let store = self.clone();
        let session = session.clone();
        tokio::task::spawn_blocking(move || store.save_sync(&session))
            .await
            .context("handle save task panicked")?
    }
}
