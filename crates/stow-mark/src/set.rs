use std::collections::HashSet;

use stow_types::BlobHandle;

/// A set of blob handles.
///
/// Used both as the visit-once guard of a walk and as its result.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlobSet {
    handles: HashSet<BlobHandle>,
}

impl BlobSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handle`; returns `true` if it was not present.
    pub fn insert(&mut self, handle: BlobHandle) -> bool {
        self.handles.insert(handle)
    }

    pub fn contains(&self, handle: &BlobHandle) -> bool {
        self.handles.contains(handle)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlobHandle> {
        self.handles.iter()
    }

    /// Number of tree handles in the set.
    pub fn tree_count(&self) -> usize {
        self.handles.iter().filter(|h| h.is_tree()).count()
    }
}

impl Extend<BlobHandle> for BlobSet {
    fn extend<I: IntoIterator<Item = BlobHandle>>(&mut self, iter: I) {
        self.handles.extend(iter);
    }
}

impl FromIterator<BlobHandle> for BlobSet {
    fn from_iter<I: IntoIterator<Item = BlobHandle>>(iter: I) -> Self {
        Self {
            handles: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for BlobSet {
    type Item = BlobHandle;
    type IntoIter = std::collections::hash_set::IntoIter<BlobHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.into_iter()
    }
}
