use serde::{Deserialize, Serialize};
use stow_types::{BlobHandle, ObjectId};

use crate::error::{StoreError, StoreResult};

// ---------------------------------------------------------------------------
// Node
// ---------------------------------------------------------------------------

/// A single entry in a directory listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Node {
    /// Regular file. `content` lists its data chunks in file order.
    File {
        name: String,
        size: u64,
        content: Vec<ObjectId>,
    },
    /// Subdirectory. `subtree` is the ID of its tree blob.
    Dir { name: String, subtree: ObjectId },
    /// Symbolic link. References no blobs.
    Symlink { name: String, target: String },
}

impl Node {
    /// File node with the given chunk IDs.
    pub fn file(name: impl Into<String>, size: u64, content: Vec<ObjectId>) -> Self {
        Self::File {
            name: name.into(),
            size,
            content,
        }
    }

    /// Directory node pointing at `subtree`.
    pub fn dir(name: impl Into<String>, subtree: ObjectId) -> Self {
        Self::Dir {
            name: name.into(),
            subtree,
        }
    }

    pub fn symlink(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::Symlink {
            name: name.into(),
            target: target.into(),
        }
    }

    /// Entry name within its parent directory.
    pub fn name(&self) -> &str {
        match self {
            Self::File { name, .. } | Self::Dir { name, .. } | Self::Symlink { name, .. } => name,
        }
    }

    /// Every blob handle this node references directly.
    pub fn referenced_handles(&self) -> Vec<BlobHandle> {
        match self {
            Self::File { content, .. } => content.iter().copied().map(BlobHandle::data).collect(),
            Self::Dir { subtree, .. } => vec![BlobHandle::tree(*subtree)],
            Self::Symlink { .. } => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// Decoded directory listing (the contents of a tree blob).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    /// Entries sorted by name.
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Create a new tree with the given nodes.
    ///
    /// Nodes are sorted by name so equal directories serialize identically.
    pub fn new(mut nodes: Vec<Node>) -> Self {
        nodes.sort_by(|a, b| a.name().cmp(b.name()));
        Self { nodes }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Serialize to the bytes stored in a tree blob.
    pub fn encode(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Content address of this tree.
    pub fn id(&self) -> StoreResult<ObjectId> {
        Ok(ObjectId::from_bytes(&self.encode()?))
    }

    /// Decode the bytes of the tree blob `id`, verifying the content hash.
    pub fn decode(id: &ObjectId, data: &[u8]) -> StoreResult<Self> {
        let handle = BlobHandle::tree(*id);
        let computed = ObjectId::from_bytes(data);
        if computed != *id {
            return Err(StoreError::HashMismatch {
                handle,
                computed: computed.to_hex(),
            });
        }
        serde_json::from_slice(data).map_err(|e| StoreError::CorruptObject {
            handle,
            reason: e.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
