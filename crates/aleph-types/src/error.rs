use thiserror::Error;

/// Errors produced by type validation and parsing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid namespace {namespace:?}: {reason}")]
    InvalidNamespace { namespace: String, reason: String },

    #[error("invalid statement id {0:?}")]
    InvalidStatementId(String),

    #[error("invalid hex string: {0}")]
    InvalidHex(String),
}
