//! Reachability and pack liveness for stow.
//!
//! Given a set of snapshots, [`find_used_blobs`] walks the tree DAG below
//! their roots and collects every reachable tree and data handle.
//! [`live_packs`] projects that set onto the repository's packs: a pack is
//! live when it holds at least one used blob. [`referenced_packs`] composes
//! the two.
//!
//! # Design Rules
//!
//! 1. Each distinct tree is loaded at most once per run, however widely shared.
//! 2. Any load or decode failure fails the whole run; there is no partial result.
//! 3. The walk is an explicit work queue drained by a bounded task pool.
//! 4. The result does not depend on traversal order or concurrency.

pub mod cancel;
pub mod config;
pub mod error;
pub mod liveness;
pub mod reachability;
pub mod run;
pub mod set;

pub use cancel::CancelToken;
pub use config::{MarkConfig, StowConfig};
pub use error::{MarkError, MarkResult};
pub use liveness::live_packs;
pub use reachability::find_used_blobs;
pub use run::{referenced_packs, referenced_packs_in_repository, ReferencedPacks};
pub use set::BlobSet;
