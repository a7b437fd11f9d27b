use aleph_types::TypeError;

/// Errors from statement and data store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The statement is missing a required field. Nothing was written.
    #[error("malformed statement: {0}")]
    Malformed(#[from] TypeError),

    /// A data object id that cannot name a stored object.
    #[error("invalid data object id: {0}")]
    InvalidId(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the backing storage.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding store state was poisoned by a panicking writer.
    #[error("store state poisoned: {0}")]
    Poisoned(String),

    /// A blocking storage task was cancelled or panicked.
    #[error("storage task failed: {0}")]
    TaskFailed(String),
}

impl StoreError {
    /// Whether the error means the backing storage is unusable, as opposed
    /// to bad input from the caller.
    pub fn is_storage_fault(&self) -> bool {
        !matches!(self, Self::Malformed(_) | Self::InvalidId(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
