use std::collections::HashMap;
use std::sync::RwLock;

use stow_types::{BlobHandle, BlobKind, ObjectId};

use crate::error::StoreResult;
use crate::object::Tree;
use crate::traits::BlobStore;

/// In-memory, HashMap-based blob store.
///
/// Intended for tests and embedding. All blobs are held in memory behind a
/// `RwLock` for safe concurrent access.
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<BlobHandle, Vec<u8>>>,
}

impl InMemoryBlobStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Store `data` as a blob of `kind` and return its handle.
    ///
    /// Idempotent: storing the same bytes twice yields the same handle.
    pub fn insert(&self, kind: BlobKind, data: &[u8]) -> BlobHandle {
        let handle = BlobHandle::new(ObjectId::from_bytes(data), kind);
        self.blobs
            .write()
            .expect("lock poisoned")
            .entry(handle)
            .or_insert_with(|| data.to_vec());
        handle
    }

    /// Store a file content chunk.
    pub fn insert_data(&self, data: &[u8]) -> BlobHandle {
        self.insert(BlobKind::Data, data)
    }

    /// Serialize and store a tree.
    pub fn insert_tree(&self, tree: &Tree) -> StoreResult<BlobHandle> {
        Ok(self.insert(BlobKind::Tree, &tree.encode()?))
    }

    /// Store arbitrary bytes under `handle` without hashing them.
    ///
    /// Lets tests plant corrupt blobs.
    pub fn insert_raw(&self, handle: BlobHandle, data: Vec<u8>) {
        self.blobs.write().expect("lock poisoned").insert(handle, data);
    }

    /// Remove a blob. Returns `true` if it was present.
    pub fn remove(&self, handle: &BlobHandle) -> bool {
        self.blobs
            .write()
            .expect("lock poisoned")
            .remove(handle)
            .is_some()
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Sorted list of all handles in the store.
    pub fn handles(&self) -> Vec<BlobHandle> {
        let map = self.blobs.read().expect("lock poisoned");
        let mut handles: Vec<BlobHandle> = map.keys().copied().collect();
        handles.sort();
        handles
    }
}

impl Default for InMemoryBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobStore for InMemoryBlobStore {
    fn read_blob(&self, handle: &BlobHandle) -> StoreResult<Option<Vec<u8>>> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.get(handle).cloned())
    }

    fn contains_blob(&self, handle: &BlobHandle) -> StoreResult<bool> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map.contains_key(handle))
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}
