//! Settings store for the connection record
//!
//! The record is kept as pretty-printed JSON in a plaintext file. It is not
//! encrypted; on Unix the file is created with mode 0600.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{RemoteError, Result};
use crate::ssh::ConnectionConfig;

/// Settings file used when none is configured
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Reads and writes the persisted [`ConnectionConfig`]
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new(DEFAULT_SETTINGS_FILE)
    }
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The persisted record, or None when nothing has been saved yet
    pub async fn load(&self) -> Result<Option<ConnectionConfig>> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(RemoteError::Io(e)),
        };
        let config = serde_json::from_str(&data).map_err(|e| {
            RemoteError::Settings(format!("failed to parse {}: {}", self.path.display(), e))
        })?;
        Ok(Some(config))
    }

    /// The persisted record, or the default record (port 22, everything else empty)
    pub async fn load_or_default(&self) -> Result<ConnectionConfig> {
        Ok(self.load().await?.unwrap_or_default())
    }

    /// The persisted record; fails with [`RemoteError::ConfigMissing`] when absent
    pub async fn require(&self) -> Result<ConnectionConfig> {
        self.load().await?.ok_or(RemoteError::ConfigMissing)
    }

    /// Persist `config`, replacing any previous record
    pub async fn save(&self, config: &ConnectionConfig) -> Result<()> {
        let data = serde_json::to_string_pretty(config)?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(&self.path).await?;
        file.write_all(data.as_bytes()).await?;
        file.flush().await?;

        info!(
            "SSH configuration saved: {}@{}:{}",
            config.username, config.host, config.port
        );
        Ok(())
    }
}
