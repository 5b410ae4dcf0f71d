use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::object::ObjectId;

/// The kind of a stored blob.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlobKind {
    /// A chunk of raw file content. Always a leaf of the object graph.
    Data,
    /// A serialized directory listing.
    Tree,
}

impl fmt::Display for BlobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => write!(f, "data"),
            Self::Tree => write!(f, "tree"),
        }
    }
}

impl FromStr for BlobKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data" => Ok(Self::Data),
            "tree" => Ok(Self::Tree),
            other => Err(TypeError::UnknownBlobKind(other.to_string())),
        }
    }
}

/// A blob identifier qualified by its kind.
///
/// Two handles with the same [`ObjectId`] but different kinds are distinct:
/// the same bytes stored once as file content and once as a tree are two
/// entries in the pack layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlobHandle {
    pub id: ObjectId,
    pub kind: BlobKind,
}

impl BlobHandle {
    pub fn new(id: ObjectId, kind: BlobKind) -> Self {
        Self { id, kind }
    }

    /// Handle for a data blob.
    pub fn data(id: ObjectId) -> Self {
        Self::new(id, BlobKind::Data)
    }

    /// Handle for a tree blob.
    pub fn tree(id: ObjectId) -> Self {
        Self::new(id, BlobKind::Tree)
    }

    pub fn is_tree(&self) -> bool {
        self.kind == BlobKind::Tree
    }
}

impl fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}/{}>", self.kind, self.id.short_hex())
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}/{}>", self.kind, self.id.short_hex())
    }
}
