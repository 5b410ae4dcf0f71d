//! Pack files for stow.
//!
//! Blobs are stored in packs: zstd-compressed, CRC-checked entries
//! concatenated behind a small header and sealed with a BLAKE3 checksum.
//! The checksum is the pack's ID.
//!
//! # Architecture
//!
//! - **Pack file** (`.pack`): header, entries, BLAKE3 trailer
//! - **Pack index** (`.idx`): fan-out table + sorted handles for O(log n) lookups
//! - **PackWriter**: builds packs from blobs
//! - **read_entry**: reads one blob by the byte range its index entry names
//! - **MasterIndex**: handle-to-pack map over every pack in a repository

pub mod entry;
pub mod error;
pub mod index;
pub mod master;
pub mod reader;
pub mod writer;

pub use entry::{Pack, PackEntry};
pub use error::{PackError, PackResult};
pub use index::{IndexRow, PackIndex};
pub use master::MasterIndex;
pub use reader::read_entry;
pub use writer::{PackFile, PackWriter};

#[cfg(test)]
mod tests {
    use super::*;
    use stow_types::{BlobHandle, BlobKind, ObjectId};

    /// Decode `handle` out of in-memory pack bytes.
    fn read(pack: &[u8], index: &PackIndex, handle: &BlobHandle) -> Vec<u8> {
        let entry = index.lookup(handle).unwrap();
        let start = entry.offset as usize;
        reader::decode_entry(&entry, &pack[start..start + entry.length as usize]).unwrap()
    }

    #[test]
    fn write_read_roundtrip_multiple() {
        let mut writer = PackWriter::new();
        let handles: Vec<BlobHandle> = (0..10)
            .map(|i| {
                let kind = if i % 2 == 0 { BlobKind::Data } else { BlobKind::Tree };
                writer.add_blob(kind, format!("blob-{i}").as_bytes())
            })
            .collect();

        let (pack_bytes, index) = writer.finish_to_bytes().unwrap();
        assert_eq!(index.blob_count(), 10);

        for (i, handle) in handles.iter().enumerate() {
            assert_eq!(read(&pack_bytes, &index, handle), format!("blob-{i}").as_bytes());
        }
    }

    #[test]
    fn large_blob_compresses() {
        let content = vec![b'A'; 100_000];
        let mut writer = PackWriter::new();
        let handle = writer.add_blob(BlobKind::Data, &content);

        let (pack_bytes, index) = writer.finish_to_bytes().unwrap();
        assert!(pack_bytes.len() < content.len());
        assert_eq!(read(&pack_bytes, &index, &handle), content);
    }

    #[test]
    fn empty_pack() {
        let writer = PackWriter::new();
        assert!(writer.is_empty());
        let (_, index) = writer.finish_to_bytes().unwrap();
        assert_eq!(index.blob_count(), 0);
        assert!(index.to_pack().entries.is_empty());
    }

    #[test]
    fn handle_id_matches_content_hash() {
        let mut writer = PackWriter::new();
        let handle = writer.add_blob(BlobKind::Tree, b"tree bytes");
        assert_eq!(handle.id, ObjectId::from_bytes(b"tree bytes"));
        assert!(handle.is_tree());
    }

    #[test]
    fn index_survives_serialization() {
        let mut writer = PackWriter::new();
        let h1 = writer.add_blob(BlobKind::Data, b"one");
        let h2 = writer.add_blob(BlobKind::Tree, b"two");
        let (pack_bytes, index) = writer.finish_to_bytes().unwrap();

        let index = PackIndex::from_bytes(&index.to_bytes()).unwrap();
        assert_eq!(read(&pack_bytes, &index, &h1), b"one");
        assert_eq!(read(&pack_bytes, &index, &h2), b"two");
    }

    #[test]
    fn disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();

        let mut writer = PackWriter::new();
        let handle = writer.add_blob(BlobKind::Data, b"on disk");
        let file = writer.finish(dir.path()).unwrap();

        assert!(file.pack_path.exists());
        assert!(file.index_path.exists());
        assert_eq!(file.blob_count, 1);
        assert_eq!(
            file.pack_path.file_stem().and_then(|s| s.to_str()),
            Some(file.id.to_hex().as_str())
        );

        let index = PackIndex::from_bytes(&std::fs::read(&file.index_path).unwrap()).unwrap();
        assert_eq!(index.pack_id(), file.id);
        let entry = index.lookup(&handle).unwrap();
        assert_eq!(read_entry(&file.pack_path, &entry).unwrap(), b"on disk");
    }

    #[test]
    fn master_index_over_written_packs() {
        let mut w1 = PackWriter::new();
        let a = w1.add_blob(BlobKind::Data, b"a");
        let (_, i1) = w1.finish_to_bytes().unwrap();

        let mut w2 = PackWriter::new();
        let b = w2.add_blob(BlobKind::Tree, b"b");
        let (_, i2) = w2.finish_to_bytes().unwrap();

        let master = MasterIndex::from_indexes([&i1, &i2]);
        assert_eq!(master.pack_count(), 2);
        let (pack, entry) = master.lookup(&a).unwrap();
        assert_eq!(pack, i1.pack_id());
        assert_eq!(entry, i1.lookup(&a).unwrap());
        assert_eq!(master.lookup(&b).unwrap().0, i2.pack_id());
    }
}
