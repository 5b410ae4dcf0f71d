//! On-disk repository for stow.
//!
//! ```text
//! <root>/
//!   data/<pack-id>.pack        sealed packs
//!   data/<pack-id>.idx         their indexes
//!   snapshots/<snapshot-id>.json
//! ```
//!
//! [`Repository`] implements [`stow_store::BlobStore`] for synchronous
//! reads. A reachability walk should go through [`RepositoryLoader`], which
//! does the same reads on tokio's blocking pool.

pub mod error;
pub mod loader;
pub mod repository;

pub use error::{RepoError, RepoResult};
pub use loader::RepositoryLoader;
pub use repository::{Repository, DATA_DIR, SNAPSHOTS_DIR};
