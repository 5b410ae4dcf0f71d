use std::path::PathBuf;

use stow_repo::RepoError;
use stow_store::{SnapshotError, StoreError};
use stow_types::BlobHandle;
use thiserror::Error;

/// Errors that end a mark run. None of them leave a partial result behind.
#[derive(Debug, Error)]
pub enum MarkError {
    /// A tree reachable from `root` could not be fetched or decoded.
    #[error("cannot load {handle} (reachable from {root}): {source}")]
    StoreAccess {
        handle: BlobHandle,
        root: BlobHandle,
        #[source]
        source: StoreError,
    },

    /// The pack index could not be loaded; nothing was traversed.
    #[error("cannot load pack index: {0}")]
    IndexLoad(#[source] RepoError),

    #[error("repository error: {0}")]
    Repository(#[from] RepoError),

    #[error("snapshot selection failed: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("mark run cancelled")]
    Cancelled,

    /// A traversal task panicked.
    #[error("traversal task failed: {0}")]
    Worker(String),

    #[error("config error in {path:?}: {reason}")]
    Config { path: PathBuf, reason: String },
}

pub type MarkResult<T> = Result<T, MarkError>;
