use async_trait::async_trait;
use stow_types::{BlobHandle, ObjectId};

use crate::error::{StoreError, StoreResult};
use crate::object::Tree;

/// Content-addressed blob store.
///
/// All implementations must satisfy these invariants:
/// - Blobs are immutable once written.
/// - Concurrent reads are always safe.
/// - The store never interprets blob contents.
/// - All I/O errors are propagated, never silently ignored.
pub trait BlobStore: Send + Sync {
    /// Read the raw bytes of a blob.
    ///
    /// Returns `Ok(None)` if the blob does not exist.
    /// Returns `Err` on I/O failure or data corruption.
    fn read_blob(&self, handle: &BlobHandle) -> StoreResult<Option<Vec<u8>>>;

    /// Check whether a blob exists in the store.
    fn contains_blob(&self, handle: &BlobHandle) -> StoreResult<bool> {
        Ok(self.read_blob(handle)?.is_some())
    }

    /// Read and decode the tree blob `id`, blocking the calling thread.
    fn read_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        let handle = BlobHandle::tree(*id);
        let data = self
            .read_blob(&handle)?
            .ok_or(StoreError::NotFound(handle))?;
        Tree::decode(id, &data)
    }
}

/// Fetch-and-decode access to tree blobs.
///
/// This is the only suspension point of a reachability walk. Every
/// [`BlobStore`] is a `TreeLoader` that reads on the calling task, which
/// suits in-memory stores. Stores doing real I/O should be wrapped in a
/// loader that moves the read off the async workers.
#[async_trait]
pub trait TreeLoader: Send + Sync {
    /// Load and decode the tree blob `id`.
    ///
    /// Fails with [`StoreError::NotFound`] when the blob is absent and with
    /// a hash or decode error when it is malformed.
    async fn load_tree(&self, id: &ObjectId) -> StoreResult<Tree>;
}

#[async_trait]
impl<S: BlobStore + ?Sized> TreeLoader for S {
    async fn load_tree(&self, id: &ObjectId) -> StoreResult<Tree> {
        self.read_tree(id)
    }
}
