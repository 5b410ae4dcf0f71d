use std::collections::HashSet;
use std::path::{Path, PathBuf};

use stow_types::{BlobHandle, BlobKind, ObjectId, PackId};
use tracing::debug;

use crate::entry::kind_to_byte;
use crate::error::{PackError, PackResult};
use crate::index::{IndexRow, PackIndex};

pub(crate) const PACK_MAGIC: &[u8; 4] = b"STWP";
pub(crate) const PACK_VERSION: u32 = 1;
pub(crate) const PACK_HEADER_LEN: usize = 12;
/// Type byte plus two one-byte varints.
pub(crate) const MIN_ENTRY_LEN: usize = 3;

/// Result of writing a pack to disk.
#[derive(Clone, Debug)]
pub struct PackFile {
    pub id: PackId,
    pub pack_path: PathBuf,
    pub index_path: PathBuf,
    pub blob_count: usize,
}

/// Builds a pack from a collection of blobs.
#[derive(Default)]
pub struct PackWriter {
    blobs: Vec<(BlobHandle, Vec<u8>)>,
    seen: HashSet<BlobHandle>,
}

impl PackWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a blob, deriving its ID from the data. Returns its handle.
    pub fn add_blob(&mut self, kind: BlobKind, data: &[u8]) -> BlobHandle {
        let handle = BlobHandle::new(ObjectId::from_bytes(data), kind);
        self.add(handle, data);
        handle
    }

    /// Add `data` under an explicit handle.
    ///
    /// A handle already queued is ignored.
    pub fn add(&mut self, handle: BlobHandle, data: &[u8]) {
        if self.seen.insert(handle) {
            self.blobs.push((handle, data.to_vec()));
        }
    }

    /// Number of blobs queued.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Write `<id>.pack` and `<id>.idx` into `dir`.
    pub fn finish(self, dir: &Path) -> PackResult<PackFile> {
        let (pack_data, index) = self.finish_to_bytes()?;
        let id = index.pack_id();
        let pack_path = dir.join(format!("{}.pack", id.to_hex()));
        let index_path = dir.join(format!("{}.idx", id.to_hex()));

        std::fs::write(&pack_path, &pack_data)?;
        std::fs::write(&index_path, index.to_bytes())?;

        debug!(pack = %id.short_hex(), blobs = index.blob_count(), "wrote pack");
        Ok(PackFile {
            id,
            pack_path,
            index_path,
            blob_count: index.blob_count(),
        })
    }

    /// Build pack bytes and index in memory (no disk I/O).
    pub fn finish_to_bytes(self) -> PackResult<(Vec<u8>, PackIndex)> {
        let mut pack_data = Vec::new();
        let mut rows: Vec<IndexRow> = Vec::with_capacity(self.blobs.len());

        // Header: magic + version + blob count
        pack_data.extend_from_slice(PACK_MAGIC);
        pack_data.extend_from_slice(&PACK_VERSION.to_be_bytes());
        pack_data.extend_from_slice(&(self.blobs.len() as u32).to_be_bytes());

        for (handle, data) in &self.blobs {
            let offset = pack_data.len() as u64;

            pack_data.push(kind_to_byte(handle.kind));

            let compressed = zstd::encode_all(data.as_slice(), 3)
                .map_err(|e| PackError::CompressionFailed(e.to_string()))?;

            encode_varint(&mut pack_data, data.len() as u64);
            encode_varint(&mut pack_data, compressed.len() as u64);

            let crc = crc32fast::hash(&compressed);
            pack_data.extend_from_slice(&compressed);

            let length = u32::try_from(pack_data.len() as u64 - offset).map_err(|_| {
                PackError::CorruptEntry {
                    offset,
                    reason: "entry larger than 4 GiB".into(),
                }
            })?;
            rows.push((*handle, crc, offset, length));
        }

        // Trailer: BLAKE3 checksum of everything so far; doubles as the pack ID.
        let checksum = *blake3::hash(&pack_data).as_bytes();
        pack_data.extend_from_slice(&checksum);

        Ok((pack_data, PackIndex::build(rows, checksum)))
    }
}

/// Encode a u64 as a variable-length integer.
pub(crate) fn encode_varint(buf: &mut Vec<u8>, mut value: u64) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Decode a variable-length integer. Returns (value, bytes_consumed).
pub(crate) fn decode_varint(data: &[u8], offset: u64) -> PackResult<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    for (i, &byte) in data.iter().enumerate() {
        value |= ((byte & 0x7F) as u64) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        if shift >= 64 {
            return Err(PackError::CorruptEntry {
                offset,
                reason: "varint overflow".into(),
            });
        }
    }
    Err(PackError::CorruptEntry {
        offset,
        reason: "truncated varint".into(),
    })
}
