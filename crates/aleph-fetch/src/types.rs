use std::fmt;
use std::net::SocketAddr;

use aleph_types::PeerId;
use serde::{Deserialize, Serialize};

pub use aleph_protocol::{DataValue, FetchResult};

/// Connectivity information for exactly one remote peer.
///
/// When `peer_id` is set, the handshake fails unless the peer at `addr`
/// identifies itself with that id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerHandle {
    pub addr: SocketAddr,
    #[serde(default)]
    pub peer_id: Option<PeerId>,
}

impl PeerHandle {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr, peer_id: None }
    }

    pub fn with_peer_id(mut self, peer_id: PeerId) -> Self {
        self.peer_id = Some(peer_id);
        self
    }
}

impl fmt::Display for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.peer_id {
            Some(peer_id) => write!(f, "{peer_id}@{}", self.addr),
            None => write!(f, "{}", self.addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_expected_peer() {
        let addr: SocketAddr = "127.0.0.1:4500".parse().unwrap();
        assert_eq!(PeerHandle::new(addr).to_string(), "127.0.0.1:4500");
        assert_eq!(
            PeerHandle::new(addr).with_peer_id(PeerId::from("ab12")).to_string(),
            "ab12@127.0.0.1:4500"
        );
    }
}
