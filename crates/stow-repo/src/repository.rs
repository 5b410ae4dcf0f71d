use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use stow_pack::{read_entry, MasterIndex, PackFile, PackIndex, PackWriter};
use stow_store::{BlobStore, Snapshot, StoreError, StoreResult};
use stow_types::{BlobHandle, PackId, SnapshotId};
use tracing::{debug, info};

use crate::error::{RepoError, RepoResult};

/// Directory holding `<pack-id>.pack` and `<pack-id>.idx` files.
pub const DATA_DIR: &str = "data";
/// Directory holding `<snapshot-id>.json` records.
pub const SNAPSHOTS_DIR: &str = "snapshots";

const PACK_EXT: &str = "pack";
const INDEX_EXT: &str = "idx";
const SNAPSHOT_EXT: &str = "json";

/// A repository on the local filesystem.
///
/// The master index is loaded on first use and cached; writing a pack
/// drops the cache. Blob reads touch only the entry's bytes in its pack.
pub struct Repository {
    root: PathBuf,
    index: RwLock<Option<Arc<MasterIndex>>>,
}

impl Repository {
    /// Create the repository layout under `root`.
    pub fn init(root: &Path) -> RepoResult<Self> {
        if root.join(DATA_DIR).exists() || root.join(SNAPSHOTS_DIR).exists() {
            return Err(RepoError::AlreadyExists(root.to_path_buf()));
        }
        fs::create_dir_all(root.join(DATA_DIR))?;
        fs::create_dir_all(root.join(SNAPSHOTS_DIR))?;
        info!(root = %root.display(), "initialized repository");
        Ok(Self::at(root))
    }

    /// Open an existing repository.
    pub fn open(root: &Path) -> RepoResult<Self> {
        if !root.join(DATA_DIR).is_dir() || !root.join(SNAPSHOTS_DIR).is_dir() {
            return Err(RepoError::NotARepository(root.to_path_buf()));
        }
        Ok(Self::at(root))
    }

    fn at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            index: RwLock::new(None),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_dir(&self) -> PathBuf {
        self.root.join(DATA_DIR)
    }

    fn snapshots_dir(&self) -> PathBuf {
        self.root.join(SNAPSHOTS_DIR)
    }

    // ---- Writing ----

    /// Seal `writer` into a pack and its index under `data/`.
    pub fn save_pack(&self, writer: PackWriter) -> RepoResult<PackFile> {
        let file = writer.finish(&self.data_dir())?;
        *self.index.write().expect("lock poisoned") = None;
        Ok(file)
    }

    /// Persist a snapshot record. Its ID is the hash of the stored bytes.
    pub fn save_snapshot(&self, snapshot: &Snapshot) -> RepoResult<SnapshotId> {
        let data = snapshot.encode()?;
        let id = SnapshotId::from_bytes(&data);
        let path = self
            .snapshots_dir()
            .join(format!("{}.{SNAPSHOT_EXT}", id.to_hex()));
        fs::write(&path, &data)?;
        debug!(snapshot = %id.short_hex(), tree = %snapshot.tree.short_hex(), "saved snapshot");
        Ok(id)
    }

    // ---- Reading ----

    /// Every snapshot in the repository, ordered by ID.
    ///
    /// A record whose content no longer hashes to its file name is an error.
    pub fn list_snapshots(&self) -> RepoResult<Vec<(SnapshotId, Snapshot)>> {
        let mut snapshots = Vec::new();
        for path in files_with_extension(&self.snapshots_dir(), SNAPSHOT_EXT)? {
            let expected = file_stem(&path).and_then(|s| SnapshotId::from_hex(s).ok());
            let Some(expected) = expected else {
                return Err(RepoError::InvalidFileName(path));
            };
            let data = fs::read(&path)?;
            let actual = SnapshotId::from_bytes(&data);
            if actual != expected {
                return Err(RepoError::SnapshotMismatch { path, actual });
            }
            snapshots.push((actual, Snapshot::decode(&data)?));
        }
        snapshots.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(snapshots)
    }

    /// Read every pack index and build the master index.
    ///
    /// Any unreadable or mismatched index fails the whole load: a pack
    /// whose contents are unknown must never look unreferenced.
    pub fn load_index(&self) -> RepoResult<Arc<MasterIndex>> {
        let mut indexes: Vec<PackIndex> = Vec::new();
        for path in files_with_extension(&self.data_dir(), INDEX_EXT)? {
            let expected = file_stem(&path).and_then(|s| PackId::from_hex(s).ok());
            let Some(expected) = expected else {
                return Err(RepoError::InvalidFileName(path));
            };
            let index = PackIndex::from_bytes(&fs::read(&path)?)?;
            if index.pack_id() != expected {
                return Err(RepoError::IndexMismatch {
                    path,
                    actual: index.pack_id(),
                });
            }
            indexes.push(index);
        }

        let master = Arc::new(MasterIndex::from_indexes(&indexes));
        info!(
            packs = master.pack_count(),
            blobs = master.total_blobs(),
            distinct = master.distinct_blobs(),
            "loaded pack index"
        );
        *self.index.write().expect("lock poisoned") = Some(Arc::clone(&master));
        Ok(master)
    }

    fn master(&self) -> RepoResult<Arc<MasterIndex>> {
        if let Some(master) = self.index.read().expect("lock poisoned").as_ref() {
            return Ok(Arc::clone(master));
        }
        self.load_index()
    }

    fn pack_path(&self, id: &PackId) -> PathBuf {
        self.data_dir().join(format!("{}.{PACK_EXT}", id.to_hex()))
    }
}

impl BlobStore for Repository {
    fn read_blob(&self, handle: &BlobHandle) -> StoreResult<Option<Vec<u8>>> {
        let master = self
            .master()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let Some((pack_id, entry)) = master.lookup(handle) else {
            return Ok(None);
        };
        read_entry(&self.pack_path(&pack_id), &entry)
            .map(Some)
            .map_err(|e| StoreError::Backend(format!("pack {}: {e}", pack_id.short_hex())))
    }
}

impl std::fmt::Debug for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let index_loaded = self.index.read().map(|i| i.is_some()).unwrap_or(false);
        f.debug_struct("Repository")
            .field("root", &self.root)
            .field("index_loaded", &index_loaded)
            .finish()
    }
}

fn file_stem(path: &Path) -> Option<&str> {
    path.file_stem().and_then(|s| s.to_str())
}

/// Regular files in `dir` with extension `ext`, sorted by name.
fn files_with_extension(dir: &Path, ext: &str) -> RepoResult<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && path.extension().is_some_and(|e| e == ext) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stow_pack::PackError;
    use stow_store::{Node, Tree, TreeLoader};
    use stow_types::{BlobKind, ObjectId};

    fn new_repo() -> (tempfile::TempDir, Repository) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        (dir, repo)
    }

    // ---- Layout ----

    #[test]
    fn init_then_open() {
        let (dir, _) = new_repo();
        assert!(dir.path().join(DATA_DIR).is_dir());
        assert!(dir.path().join(SNAPSHOTS_DIR).is_dir());
        let repo = Repository::open(dir.path()).unwrap();
        assert_eq!(repo.root(), dir.path());
    }

    #[test]
    fn open_missing_layout_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = Repository::open(dir.path()).unwrap_err();
        assert!(matches!(err, RepoError::NotARepository(_)));
    }

    #[test]
    fn init_twice_fails() {
        let (dir, _) = new_repo();
        let err = Repository::init(dir.path()).unwrap_err();
        assert!(matches!(err, RepoError::AlreadyExists(_)));
    }

    // ---- Packs ----

    #[test]
    fn empty_repository_has_empty_index() {
        let (_dir, repo) = new_repo();
        let master = repo.load_index().unwrap();
        assert_eq!(master.pack_count(), 0);
        let handle = BlobHandle::data(ObjectId::from_bytes(b"x"));
        assert!(repo.read_blob(&handle).unwrap().is_none());
    }

    #[test]
    fn saved_blobs_are_readable() {
        let (_dir, repo) = new_repo();
        let mut writer = PackWriter::new();
        let handle = writer.add_blob(BlobKind::Data, b"chunk");
        let file = repo.save_pack(writer).unwrap();

        let master = repo.load_index().unwrap();
        assert_eq!(master.pack_count(), 1);
        assert_eq!(master.packs()[0].id, file.id);
        assert_eq!(repo.read_blob(&handle).unwrap().unwrap(), b"chunk");
        assert!(!repo.contains_blob(&BlobHandle::tree(handle.id)).unwrap());
    }

    #[test]
    fn save_pack_refreshes_cached_index() {
        let (_dir, repo) = new_repo();
        let mut w1 = PackWriter::new();
        w1.add_blob(BlobKind::Data, b"first");
        repo.save_pack(w1).unwrap();
        assert_eq!(repo.load_index().unwrap().pack_count(), 1);

        let mut w2 = PackWriter::new();
        let second = w2.add_blob(BlobKind::Data, b"second");
        repo.save_pack(w2).unwrap();
        assert!(repo.contains_blob(&second).unwrap());
    }

    #[test]
    fn renamed_index_is_rejected() {
        let (dir, repo) = new_repo();
        let mut writer = PackWriter::new();
        writer.add_blob(BlobKind::Data, b"blob");
        let file = repo.save_pack(writer).unwrap();

        let bogus = dir
            .path()
            .join(DATA_DIR)
            .join(format!("{}.idx", PackId::from_hash([7; 32]).to_hex()));
        fs::rename(&file.index_path, &bogus).unwrap();

        let err = repo.load_index().unwrap_err();
        assert!(matches!(err, RepoError::IndexMismatch { actual, .. } if actual == file.id));
    }

    #[test]
    fn corrupt_index_fails_the_load() {
        let (_dir, repo) = new_repo();
        let mut writer = PackWriter::new();
        writer.add_blob(BlobKind::Data, b"blob");
        let file = repo.save_pack(writer).unwrap();
        fs::write(&file.index_path, b"garbage").unwrap();

        let err = repo.load_index().unwrap_err();
        assert!(matches!(err, RepoError::Pack(PackError::IndexCorrupted(_))));
    }

    #[test]
    fn badly_named_index_is_rejected() {
        let (dir, repo) = new_repo();
        fs::write(dir.path().join(DATA_DIR).join("notes.idx"), b"").unwrap();
        let err = repo.load_index().unwrap_err();
        assert!(matches!(err, RepoError::InvalidFileName(_)));
    }

    #[test]
    fn missing_pack_surfaces_as_backend_error() {
        let (_dir, repo) = new_repo();
        let mut writer = PackWriter::new();
        let handle = writer.add_blob(BlobKind::Data, b"blob");
        let file = repo.save_pack(writer).unwrap();
        fs::remove_file(&file.pack_path).unwrap();

        let err = repo.read_blob(&handle).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test]
    async fn trees_load_through_repository() {
        let (_dir, repo) = new_repo();
        let tree = Tree::new(vec![Node::symlink("link", "/target")]);
        let bytes = tree.encode().unwrap();

        let mut writer = PackWriter::new();
        let handle = writer.add_blob(BlobKind::Tree, &bytes);
        repo.save_pack(writer).unwrap();

        let loaded = repo.load_tree(&handle.id).await.unwrap();
        assert_eq!(loaded, tree);

        let missing = ObjectId::from_bytes(b"absent");
        let err = repo.load_tree(&missing).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(h) if h == BlobHandle::tree(missing)));
    }

    // ---- Snapshots ----

    #[test]
    fn snapshots_roundtrip() {
        let (_dir, repo) = new_repo();
        let a = Snapshot::new(ObjectId::from_bytes(b"root-a"), "host", vec!["/a".into()]);
        let b = Snapshot::new(ObjectId::from_bytes(b"root-b"), "host", vec!["/b".into()]);
        let id_a = repo.save_snapshot(&a).unwrap();
        let id_b = repo.save_snapshot(&b).unwrap();

        let listed = repo.list_snapshots().unwrap();
        assert_eq!(listed.len(), 2);
        let ids: Vec<SnapshotId> = listed.iter().map(|(id, _)| *id).collect();
        assert!(ids.contains(&id_a) && ids.contains(&id_b));
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(id_a, a.id().unwrap());
    }

    #[test]
    fn tampered_snapshot_is_rejected() {
        let (dir, repo) = new_repo();
        let sn = Snapshot::new(ObjectId::from_bytes(b"root"), "host", vec![]);
        let id = repo.save_snapshot(&sn).unwrap();

        let path = dir
            .path()
            .join(SNAPSHOTS_DIR)
            .join(format!("{}.json", id.to_hex()));
        let other = Snapshot::new(ObjectId::from_bytes(b"other"), "host", vec![]);
        fs::write(&path, other.encode().unwrap()).unwrap();

        let err = repo.list_snapshots().unwrap_err();
        assert!(matches!(err, RepoError::SnapshotMismatch { .. }));
    }

    #[test]
    fn unrelated_files_are_ignored() {
        let (dir, repo) = new_repo();
        fs::write(dir.path().join(SNAPSHOTS_DIR).join("README"), b"hi").unwrap();
        fs::create_dir(dir.path().join(DATA_DIR).join("tmp")).unwrap();
        assert!(repo.list_snapshots().unwrap().is_empty());
        assert_eq!(repo.load_index().unwrap().pack_count(), 0);
    }
}
