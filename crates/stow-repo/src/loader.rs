use std::sync::Arc;

use async_trait::async_trait;
use stow_store::{BlobStore, StoreError, StoreResult, Tree, TreeLoader};
use stow_types::ObjectId;

use crate::repository::Repository;

/// Loads trees from a [`Repository`] on tokio's blocking pool.
///
/// Pack reads are plain file I/O; running them here keeps the async
/// workers free to observe cancellation while reads are in flight.
#[derive(Clone, Debug)]
pub struct RepositoryLoader {
    repo: Arc<Repository>,
}

impl RepositoryLoader {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl TreeLoader for RepositoryLoader {
    async fn load_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        let repo = Arc::clone(&self.repo);
        let id = *id;
        tokio::task::spawn_blocking(move || repo.read_tree(&id))
            .await
            .map_err(|e| StoreError::Backend(format!("tree read task failed: {e}")))?
    }
}
