use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_PEER_URL: &str = "http://127.0.0.1:9001";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for one [`RestClient`](crate::RestClient).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the node's administrative surface.
    pub peer_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(peer_url: impl Into<String>) -> Self {
        Self {
            peer_url: peer_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            peer_url: DEFAULT_PEER_URL.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}
