use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Flush strategy for the statement log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every append (safest, highest latency).
    EveryWrite,
    /// Rely on OS page-cache buffering.
    #[default]
    OsDefault,
}

/// Where and how a statement store keeps its data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Statement log file. `None` keeps everything in memory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub sync_mode: SyncMode,
}

impl StoreConfig {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            sync_mode: SyncMode::default(),
        }
    }

    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }
}
