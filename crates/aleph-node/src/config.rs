use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use aleph_store::{StoreConfig, SyncMode};
use aleph_types::PeerId;
use serde::{Deserialize, Serialize};

use crate::error::{NodeError, NodeResult};

pub const DEFAULT_FETCH_PORT: u16 = 9002;
pub const DEFAULT_ADMIN_PORT: u16 = 9001;
pub const DEFAULT_PUBLISHER: &str = "aleph";

/// File name of the statement log inside the data directory.
pub const STATEMENT_LOG: &str = "statements.log";

/// Directory of data object files inside the data directory.
pub const DATA_OBJECTS: &str = "objects";

/// Everything a node needs at construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Where the remote fetch server listens.
    pub fetch_addr: SocketAddr,
    /// Where the administrative HTTP surface listens.
    pub admin_addr: SocketAddr,
    /// Directory for durable state: the statement log and one file per data
    /// object. Absent keeps both in memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
    /// Hex-encoded Ed25519 secret. Generated on first start if missing;
    /// absent means a fresh identity every run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_file: Option<PathBuf>,
    /// Publisher name used in the ids of statements this node publishes.
    pub publisher: String,
    pub sync_mode: SyncMode,
    /// Static peer directory: peer id to fetch address.
    pub peers: BTreeMap<PeerId, SocketAddr>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            fetch_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_FETCH_PORT)),
            admin_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_ADMIN_PORT)),
            data_dir: None,
            key_file: None,
            publisher: DEFAULT_PUBLISHER.into(),
            sync_mode: SyncMode::default(),
            peers: BTreeMap::new(),
        }
    }
}

impl NodeConfig {
    /// In-memory node on OS-assigned local ports.
    pub fn ephemeral() -> Self {
        Self {
            fetch_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            admin_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> NodeResult<Self> {
        toml::from_str(text).map_err(|e| NodeError::Config(e.to_string()))
    }

    pub fn from_toml_file(path: &Path) -> NodeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
            .map_err(|e| NodeError::Config(format!("{}: {e}", path.display())))
    }

    pub fn to_toml_string(&self) -> NodeResult<String> {
        toml::to_string_pretty(self).map_err(|e| NodeError::Config(e.to_string()))
    }

    /// Statement store settings derived from `data_dir` and `sync_mode`.
    pub fn store_config(&self) -> StoreConfig {
        match &self.data_dir {
            Some(dir) => StoreConfig::at_path(dir.join(STATEMENT_LOG)).with_sync_mode(self.sync_mode),
            None => StoreConfig::in_memory().with_sync_mode(self.sync_mode),
        }
    }

    /// Where data objects are kept, if anywhere on disk.
    pub fn objects_dir(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(DATA_OBJECTS))
    }
}
