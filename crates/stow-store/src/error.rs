use stow_types::BlobHandle;

/// Errors from blob store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob was not found.
    #[error("blob not found: {0}")]
    NotFound(BlobHandle),

    /// The blob bytes do not hash to the requested ID.
    #[error("hash mismatch for {handle}: computed {computed}")]
    HashMismatch { handle: BlobHandle, computed: String },

    /// The blob data is malformed or cannot be decoded.
    #[error("corrupt blob {handle}: {reason}")]
    CorruptObject { handle: BlobHandle, reason: String },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure in the backend that holds the blob (pack read, index lookup).
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
