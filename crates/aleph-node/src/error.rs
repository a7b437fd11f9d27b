use aleph_types::{PeerId, StatementId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("statement not found: {0}")]
    StatementNotFound(StatementId),

    #[error("unknown peer: {0}")]
    UnknownPeer(PeerId),

    #[error("invalid input: {0}")]
    Invalid(#[from] aleph_types::TypeError),

    #[error("store error: {0}")]
    Store(#[from] aleph_store::StoreError),

    #[error("fetch error: {0}")]
    Fetch(#[from] aleph_fetch::FetchError),

    #[error("signature error: {0}")]
    Signature(#[from] aleph_crypto::SignatureError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type NodeResult<T> = Result<T, NodeError>;
