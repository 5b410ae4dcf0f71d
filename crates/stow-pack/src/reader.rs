use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

use crate::entry::{kind_from_byte, PackEntry};
use crate::error::{PackError, PackResult};
use crate::writer::{decode_varint, MIN_ENTRY_LEN, PACK_HEADER_LEN};

/// Read and decompress one blob from the pack at `pack_path`.
///
/// Only the entry's byte range is read. The entry comes from an index
/// lookup; its CRC and sizes are checked against what is on disk.
pub fn read_entry(pack_path: &Path, entry: &PackEntry) -> PackResult<Vec<u8>> {
    let offset = entry.offset;
    if offset < PACK_HEADER_LEN as u64 || (entry.length as usize) < MIN_ENTRY_LEN {
        return Err(PackError::CorruptEntry {
            offset,
            reason: format!("implausible entry of {} bytes", entry.length),
        });
    }

    let mut file = File::open(pack_path)?;
    let pack_len = file.metadata()?.len();
    if offset.saturating_add(entry.length as u64) > pack_len {
        return Err(PackError::CorruptEntry {
            offset,
            reason: format!("entry extends beyond pack data ({pack_len} bytes)"),
        });
    }

    file.seek(SeekFrom::Start(offset))?;
    let mut raw = vec![0u8; entry.length as usize];
    file.read_exact(&mut raw)?;
    decode_entry(entry, &raw)
}

/// Decode the raw bytes of `entry`: type byte, two varint sizes, then
/// zstd data covered by the CRC.
pub(crate) fn decode_entry(entry: &PackEntry, raw: &[u8]) -> PackResult<Vec<u8>> {
    let offset = entry.offset;
    let corrupt = |reason: String| PackError::CorruptEntry { offset, reason };

    let Some((&type_byte, rest)) = raw.split_first() else {
        return Err(corrupt("empty entry".into()));
    };
    match kind_from_byte(type_byte) {
        Some(kind) if kind == entry.handle.kind => {}
        Some(kind) => {
            return Err(corrupt(format!(
                "entry holds a {kind} blob, index says {}",
                entry.handle.kind
            )))
        }
        None => return Err(corrupt(format!("unknown type byte: {type_byte}"))),
    }

    let (uncompressed_size, first) = decode_varint(rest, offset)?;
    let (compressed_size, second) = decode_varint(&rest[first..], offset)?;
    let compressed = &rest[first + second..];
    if compressed.len() as u64 != compressed_size {
        return Err(corrupt("compressed size disagrees with index length".into()));
    }

    if crc32fast::hash(compressed) != entry.crc32 {
        return Err(PackError::CrcMismatch(entry.handle));
    }

    let decompressed =
        zstd::decode_all(compressed).map_err(|e| PackError::DecompressionFailed(e.to_string()))?;
    if decompressed.len() as u64 != uncompressed_size {
        return Err(corrupt(format!(
            "size mismatch: expected {uncompressed_size}, got {}",
            decompressed.len()
        )));
    }
    Ok(decompressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::PackIndex;
    use crate::writer::{PackFile, PackWriter};
    use stow_types::{BlobHandle, BlobKind, ObjectId};

    struct Written {
        _dir: tempfile::TempDir,
        file: PackFile,
        index: PackIndex,
        data: BlobHandle,
        tree: BlobHandle,
    }

    fn small_pack() -> Written {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = PackWriter::new();
        let data = writer.add_blob(BlobKind::Data, b"hello pack");
        let tree = writer.add_blob(BlobKind::Tree, b"{\"nodes\":[]}");
        let file = writer.finish(dir.path()).unwrap();
        let index = PackIndex::from_bytes(&std::fs::read(&file.index_path).unwrap()).unwrap();
        Written { _dir: dir, file, index, data, tree }
    }

    #[test]
    fn reads_entries_by_range() {
        let w = small_pack();
        let entry = w.index.lookup(&w.data).unwrap();
        assert_eq!(read_entry(&w.file.pack_path, &entry).unwrap(), b"hello pack");
        let entry = w.index.lookup(&w.tree).unwrap();
        assert_eq!(read_entry(&w.file.pack_path, &entry).unwrap(), b"{\"nodes\":[]}");
    }

    #[test]
    fn kind_mismatch_is_corrupt() {
        let w = small_pack();
        let mut entry = w.index.lookup(&w.data).unwrap();
        entry.handle = BlobHandle::tree(entry.handle.id);
        let err = read_entry(&w.file.pack_path, &entry).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry { .. }));
    }

    #[test]
    fn flipped_payload_byte_fails_crc() {
        let w = small_pack();
        let entry = w.index.lookup(&w.data).unwrap();
        let mut bytes = std::fs::read(&w.file.pack_path).unwrap();
        let last = (entry.offset + entry.length as u64 - 1) as usize;
        bytes[last] ^= 0xFF;
        std::fs::write(&w.file.pack_path, &bytes).unwrap();

        let err = read_entry(&w.file.pack_path, &entry).unwrap_err();
        assert!(matches!(err, PackError::CrcMismatch(h) if h == w.data));
    }

    #[test]
    fn truncated_pack_is_corrupt() {
        let w = small_pack();
        let entry = w.index.lookup(&w.data).unwrap();
        let bytes = std::fs::read(&w.file.pack_path).unwrap();
        std::fs::write(&w.file.pack_path, &bytes[..entry.offset as usize + 1]).unwrap();

        let err = read_entry(&w.file.pack_path, &entry).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry { offset, .. } if offset == entry.offset));
    }

    #[test]
    fn implausible_entries_are_rejected_before_reading() {
        let w = small_pack();
        let mut entry = w.index.lookup(&w.data).unwrap();
        entry.length = 0;
        assert!(matches!(
            read_entry(&w.file.pack_path, &entry),
            Err(PackError::CorruptEntry { .. })
        ));

        let mut entry = w.index.lookup(&w.data).unwrap();
        entry.offset = 0;
        assert!(matches!(
            read_entry(&w.file.pack_path, &entry),
            Err(PackError::CorruptEntry { offset: 0, .. })
        ));
    }

    #[test]
    fn empty_raw_entry_is_corrupt() {
        let entry = PackEntry {
            handle: BlobHandle::data(ObjectId::from_bytes(b"x")),
            offset: 40,
            length: 0,
            crc32: 0,
        };
        let err = decode_entry(&entry, &[]).unwrap_err();
        assert!(matches!(err, PackError::CorruptEntry { offset: 40, .. }));
    }

    #[test]
    fn missing_pack_file_is_io_error() {
        let w = small_pack();
        let entry = w.index.lookup(&w.data).unwrap();
        std::fs::remove_file(&w.file.pack_path).unwrap();
        assert!(matches!(
            read_entry(&w.file.pack_path, &entry),
            Err(PackError::Io(_))
        ));
    }
}
