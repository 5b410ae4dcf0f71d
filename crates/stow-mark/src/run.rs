use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use stow_pack::Pack;
use stow_repo::{Repository, RepositoryLoader};
use stow_store::{select_snapshots, Snapshot, SnapshotFilter, TreeLoader};
use stow_types::{BlobHandle, PackId};
use tracing::info;

use crate::cancel::CancelToken;
use crate::config::MarkConfig;
use crate::error::{MarkError, MarkResult};
use crate::liveness::live_packs;
use crate::reachability::find_used_blobs;

/// Outcome of a successful run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReferencedPacks {
    /// Packs holding at least one blob reachable from the snapshots.
    pub packs: BTreeSet<PackId>,
    pub snapshots: usize,
    pub used_blobs: usize,
    pub used_trees: usize,
    pub total_packs: usize,
}

/// Mark everything reachable from `snapshots` and project it onto `packs`.
pub async fn referenced_packs<L>(
    loader: Arc<L>,
    snapshots: &[Snapshot],
    packs: &[Pack],
    config: &MarkConfig,
    cancel: &CancelToken,
) -> MarkResult<ReferencedPacks>
where
    L: TreeLoader + ?Sized + 'static,
{
    let roots: Vec<BlobHandle> = snapshots.iter().map(Snapshot::root_handle).collect();
    let used = find_used_blobs(loader, &roots, config, cancel).await?;
    let live = live_packs(&used, packs);

    info!(
        snapshots = snapshots.len(),
        used = used.len(),
        live = live.len(),
        total = packs.len(),
        "found referenced packs"
    );
    Ok(ReferencedPacks {
        packs: live,
        snapshots: snapshots.len(),
        used_blobs: used.len(),
        used_trees: used.tree_count(),
        total_packs: packs.len(),
    })
}

/// Full run against a repository: load the index, select snapshots, mark.
///
/// The index is loaded before anything is traversed.
pub async fn referenced_packs_in_repository(
    repo: Arc<Repository>,
    filter: &SnapshotFilter,
    config: &MarkConfig,
    cancel: &CancelToken,
) -> MarkResult<ReferencedPacks> {
    let index = repo.load_index().map_err(MarkError::IndexLoad)?;
    let all = repo.list_snapshots()?;
    let snapshots: Vec<Snapshot> = select_snapshots(&all, filter)?
        .into_iter()
        .map(|(_, sn)| sn)
        .collect();
    let loader = Arc::new(RepositoryLoader::new(repo));
    referenced_packs(loader, &snapshots, index.packs(), config, cancel).await
}
