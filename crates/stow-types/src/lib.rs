//! Foundation types for stow.
//!
//! Every other stow crate depends on `stow-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Content-addressed identifier (BLAKE3 hash of the object bytes)
//! - [`BlobKind`] -- Data chunk vs. serialized directory listing
//! - [`BlobHandle`] -- `(ObjectId, BlobKind)`, the unit of reachability
//! - [`PackId`] -- Identifier of a physical pack file
//! - [`SnapshotId`] -- Identifier of a snapshot record

pub mod error;
pub mod handle;
pub mod id;
pub mod object;

pub use error::TypeError;
pub use handle::{BlobHandle, BlobKind};
pub use id::{PackId, SnapshotId};
pub use object::ObjectId;
