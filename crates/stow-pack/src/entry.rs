use serde::{Deserialize, Serialize};
use stow_types::{BlobHandle, BlobKind, PackId};

/// Serialize a blob kind to the type byte used in pack entries and indexes.
pub fn kind_to_byte(kind: BlobKind) -> u8 {
    match kind {
        BlobKind::Data => 1,
        BlobKind::Tree => 2,
    }
}

/// Parse a type byte.
pub fn kind_from_byte(byte: u8) -> Option<BlobKind> {
    match byte {
        1 => Some(BlobKind::Data),
        2 => Some(BlobKind::Tree),
        _ => None,
    }
}

/// Location of one blob inside a pack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackEntry {
    pub handle: BlobHandle,
    /// Byte offset of the entry header within the pack.
    pub offset: u64,
    /// Length of the encoded entry (header plus compressed data).
    pub length: u32,
    /// CRC32 of the compressed data.
    pub crc32: u32,
}

/// A pack and the blobs it holds, in pack order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pack {
    pub id: PackId,
    pub entries: Vec<PackEntry>,
}

impl Pack {
    pub fn blob_count(&self) -> usize {
        self.entries.len()
    }

    /// Iterate the handles stored in this pack.
    pub fn handles(&self) -> impl Iterator<Item = &BlobHandle> {
        self.entries.iter().map(|e| &e.handle)
    }
}
