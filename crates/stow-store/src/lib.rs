//! Object model and blob access for stow.
//!
//! A backup is a Merkle DAG: a [`Snapshot`] points at a root [`Tree`], trees
//! list [`Node`]s, directory nodes point at subtrees and file nodes point at
//! data chunks. Identical directories and chunks are stored once and shared
//! by every parent and snapshot that references them.
//!
//! # Access
//!
//! - [`BlobStore`] -- synchronous raw blob reads keyed by [`stow_types::BlobHandle`]
//! - [`TreeLoader`] -- async fetch-and-decode of tree blobs, implemented for
//!   every `BlobStore`
//! - [`InMemoryBlobStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written (content-addressing guarantees this).
//! 2. Tree decoding verifies the content hash before parsing.
//! 3. Concurrent reads are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod memory;
pub mod object;
pub mod snapshot;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryBlobStore;
pub use object::{Node, Tree};
pub use snapshot::{select_snapshots, Snapshot, SnapshotError, SnapshotFilter, LATEST};
pub use traits::{BlobStore, TreeLoader};
