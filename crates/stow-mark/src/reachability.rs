//! Reachability walk over the tree DAG.
//!
//! The walk keeps two sets. `seen` holds every tree already scheduled for
//! expansion and guarantees each distinct tree is loaded once, however many
//! parents or snapshots share it. `used` is the result: every tree and data
//! handle reachable from the roots. Data handles go into `used` only; they
//! are leaves and never scheduled.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use stow_store::{Node, TreeLoader};
use stow_types::BlobHandle;
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::config::MarkConfig;
use crate::error::{MarkError, MarkResult};
use crate::set::BlobSet;

/// One unit of work: expand `tree`, first reached from `root`.
#[derive(Clone, Copy, Debug)]
struct Expand {
    tree: BlobHandle,
    root: BlobHandle,
}

#[derive(Default)]
struct Shared {
    seen: Mutex<BlobSet>,
    used: Mutex<BlobSet>,
}

/// Compute every blob handle reachable from `roots`.
///
/// Trees are loaded by at most `config.concurrency` tasks at a time. The
/// first load or decode failure aborts the walk with
/// [`MarkError::StoreAccess`]; cancelling `cancel` aborts it with
/// [`MarkError::Cancelled`]. Either way no partial set is returned.
///
/// Roots are expected to be tree handles. A data root is recorded as used
/// but has nothing to expand.
pub async fn find_used_blobs<L>(
    loader: Arc<L>,
    roots: &[BlobHandle],
    config: &MarkConfig,
    cancel: &CancelToken,
) -> MarkResult<BlobSet>
where
    L: TreeLoader + ?Sized + 'static,
{
    let limit = config.effective_concurrency();
    let shared = Arc::new(Shared::default());
    let mut queue: VecDeque<Expand> = VecDeque::new();

    {
        let mut seen = shared.seen.lock().expect("lock poisoned");
        let mut used = shared.used.lock().expect("lock poisoned");
        for &root in roots {
            if !seen.insert(root) {
                continue;
            }
            used.insert(root);
            if root.is_tree() {
                queue.push_back(Expand { tree: root, root });
            }
        }
    }
    debug!(roots = roots.len(), distinct = queue.len(), limit, "starting mark");

    let mut tasks: JoinSet<MarkResult<Vec<Expand>>> = JoinSet::new();
    let mut expanded = 0usize;

    loop {
        if cancel.is_cancelled() {
            tasks.abort_all();
            return Err(MarkError::Cancelled);
        }

        while tasks.len() < limit {
            let Some(item) = queue.pop_front() else {
                break;
            };
            let loader = Arc::clone(&loader);
            let shared = Arc::clone(&shared);
            tasks.spawn(async move { expand(&*loader, &shared, item).await });
        }

        if tasks.is_empty() {
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tasks.abort_all();
                return Err(MarkError::Cancelled);
            }
            joined = tasks.join_next() => match joined {
                Some(Ok(Ok(children))) => {
                    expanded += 1;
                    queue.extend(children);
                }
                Some(Ok(Err(err))) => {
                    tasks.abort_all();
                    return Err(err);
                }
                Some(Err(join_err)) => {
                    tasks.abort_all();
                    return Err(MarkError::Worker(join_err.to_string()));
                }
                None => {}
            },
        }
    }

    let used = std::mem::take(&mut *shared.used.lock().expect("lock poisoned"));
    info!(
        roots = roots.len(),
        trees = expanded,
        used = used.len(),
        "mark complete"
    );
    Ok(used)
}

/// Load one tree and record its children.
///
/// Returns the subtrees this call was first to see; the caller schedules them.
async fn expand<L>(loader: &L, shared: &Shared, item: Expand) -> MarkResult<Vec<Expand>>
where
    L: TreeLoader + ?Sized,
{
    let tree = loader
        .load_tree(&item.tree.id)
        .await
        .map_err(|source| MarkError::StoreAccess {
            handle: item.tree,
            root: item.root,
            source,
        })?;

    let (subtrees, data): (Vec<BlobHandle>, Vec<BlobHandle>) = tree
        .nodes
        .iter()
        .flat_map(Node::referenced_handles)
        .partition(BlobHandle::is_tree);

    // Check-and-insert for the whole batch under one lock.
    let fresh: Vec<BlobHandle> = {
        let mut seen = shared.seen.lock().expect("lock poisoned");
        subtrees.into_iter().filter(|h| seen.insert(*h)).collect()
    };

    {
        let mut used = shared.used.lock().expect("lock poisoned");
        used.extend(data);
        used.extend(fresh.iter().copied());
    }

    debug!(
        tree = %item.tree.id.short_hex(),
        nodes = tree.nodes.len(),
        new_subtrees = fresh.len(),
        "expanded tree"
    );

    Ok(fresh
        .into_iter()
        .map(|tree| Expand {
            tree,
            root: item.root,
        })
        .collect())
}
