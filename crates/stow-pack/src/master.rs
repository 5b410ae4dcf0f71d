use std::collections::{HashMap, HashSet};

use stow_types::{BlobHandle, PackId};
use tracing::debug;

use crate::entry::{Pack, PackEntry};
use crate::index::PackIndex;

/// In-memory index over every pack in a repository.
///
/// Maps each blob handle to the pack that stores it. A handle stored in
/// more than one pack resolves to the first pack added.
#[derive(Debug, Default)]
pub struct MasterIndex {
    packs: Vec<Pack>,
    pack_ids: HashSet<PackId>,
    by_handle: HashMap<BlobHandle, (usize, usize)>,
}

impl MasterIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a set of per-pack indexes.
    pub fn from_indexes<'a>(indexes: impl IntoIterator<Item = &'a PackIndex>) -> Self {
        let mut master = Self::new();
        for index in indexes {
            master.add_pack(index.to_pack());
        }
        master
    }

    /// Register a pack. Adding a pack id twice is a no-op.
    pub fn add_pack(&mut self, pack: Pack) {
        if !self.pack_ids.insert(pack.id) {
            debug!(pack = %pack.id.short_hex(), "pack already indexed");
            return;
        }
        let pack_idx = self.packs.len();
        for (entry_idx, entry) in pack.entries.iter().enumerate() {
            if let Some(&(existing, _)) = self.by_handle.get(&entry.handle) {
                debug!(
                    blob = %entry.handle,
                    kept = %self.packs[existing].id.short_hex(),
                    duplicate = %pack.id.short_hex(),
                    "blob stored in more than one pack"
                );
                continue;
            }
            self.by_handle.insert(entry.handle, (pack_idx, entry_idx));
        }
        self.packs.push(pack);
    }

    /// Locate a blob: the pack holding it and its entry.
    pub fn lookup(&self, handle: &BlobHandle) -> Option<(PackId, PackEntry)> {
        let &(pack_idx, entry_idx) = self.by_handle.get(handle)?;
        let pack = &self.packs[pack_idx];
        Some((pack.id, pack.entries[entry_idx]))
    }

    /// All packs, in the order they were added.
    pub fn packs(&self) -> &[Pack] {
        &self.packs
    }

    /// Number of entries across all packs, duplicates included.
    pub fn total_blobs(&self) -> usize {
        self.packs.iter().map(Pack::blob_count).sum()
    }

    /// Number of distinct handles.
    pub fn distinct_blobs(&self) -> usize {
        self.by_handle.len()
    }

    pub fn pack_count(&self) -> usize {
        self.packs.len()
    }
}
