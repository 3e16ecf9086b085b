//! Persistent store for the runtime-editable broadcast config.
//!
//! The file is re-read before every scheduling and broadcast decision, so
//! edits through the control surface take effect without a restart. Writes
//! go through a temp file + rename so a concurrent reader sees either the
//! old or the new config, never a torn one.

use std::path::{Path, PathBuf};

use herald_types::BroadcastConfig;

use crate::ConfigError;

/// JSON-file-backed store for [`BroadcastConfig`].
#[derive(Debug, Clone)]
pub struct BroadcastStore {
    path: PathBuf,
}

impl BroadcastStore {
    /// A store backed by the given file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The conventional store location inside a data directory.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join("broadcast.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored config. An absent file yields the defaults; a
    /// present-but-malformed file is an error, never a silent default.
    pub fn load(&self) -> Result<BroadcastConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(BroadcastConfig::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    /// Atomically replace the stored config.
    pub fn save(&self, config: &BroadcastConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::Io(std::io::Error::other(e)))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
