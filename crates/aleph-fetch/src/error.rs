use std::net::SocketAddr;

use aleph_protocol::ProtocolError;
use aleph_types::ContentId;
use thiserror::Error;

/// Errors from remote fetch exchanges.
///
/// Connection faults (`Connection`, `Handshake`, `Closed`, and transport
/// level codec failures) mean no usable answer was obtained and the call may
/// be retried. Everything else is a protocol fault: the peer answered, but
/// the answer broke the fetch contract.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("cannot connect to {addr}: {source}")]
    Connection {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("handshake with {addr} failed: {reason}")]
    Handshake { addr: SocketAddr, reason: String },

    #[error("connection to {addr} closed by peer")]
    Closed { addr: SocketAddr },

    #[error("response count mismatch: requested {expected}, received {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("key mismatch at position {position}: requested {expected}, received {actual}")]
    KeyMismatch {
        position: usize,
        expected: ContentId,
        actual: ContentId,
    },

    #[error("unexpected message: expected {expected}, received {actual}")]
    UnexpectedMessage {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("remote error: code={code}, message={message}")]
    Remote { code: u32, message: String },

    #[error("codec error: {0}")]
    Codec(#[from] ProtocolError),
}

impl FetchError {
    /// The peer was unreachable or the transport failed.
    pub fn is_connection_fault(&self) -> bool {
        match self {
            Self::Connection { .. } | Self::Handshake { .. } | Self::Closed { .. } => true,
            Self::Codec(e) => e.is_transport(),
            _ => false,
        }
    }

    /// The peer's response was malformed. Not worth retrying without
    /// investigating the peer.
    pub fn is_protocol_fault(&self) -> bool {
        !self.is_connection_fault()
    }

    pub fn is_retryable(&self) -> bool {
        self.is_connection_fault()
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
