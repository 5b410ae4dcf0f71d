use std::path::PathBuf;

use stow_types::{PackId, SnapshotId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("not a stow repository: {0:?}")]
    NotARepository(PathBuf),

    #[error("repository already exists at {0:?}")]
    AlreadyExists(PathBuf),

    #[error("file name is not an object id: {0:?}")]
    InvalidFileName(PathBuf),

    #[error("index {path:?} describes pack {actual}")]
    IndexMismatch { path: PathBuf, actual: PackId },

    #[error("snapshot file {path:?} hashes to {actual}")]
    SnapshotMismatch { path: PathBuf, actual: SnapshotId },

    #[error("pack error: {0}")]
    Pack(#[from] stow_pack::PackError),

    #[error("store error: {0}")]
    Store(#[from] stow_store::StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RepoResult<T> = Result<T, RepoError>;
