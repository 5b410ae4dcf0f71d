use stow_types::{BlobHandle, ObjectId, PackId};

use crate::entry::{kind_from_byte, kind_to_byte, Pack, PackEntry};
use crate::error::{PackError, PackResult};
use crate::writer::{MIN_ENTRY_LEN, PACK_HEADER_LEN};

const INDEX_MAGIC: &[u8; 4] = b"STWI";
const INDEX_VERSION: u32 = 1;

/// Per-pack index for random-access lookups.
///
/// Layout:
/// - Fan-out table: 256 entries counting handles with first id byte <= index
/// - Sorted handle ids, with a parallel kind byte array
/// - CRC32 array (parallel)
/// - Offset array (parallel)
/// - Length array (parallel)
/// - Pack checksum, which is also the pack's ID
#[derive(Clone, Debug)]
pub struct PackIndex {
    pub fan_out: [u32; 256],
    pub handles: Vec<BlobHandle>,
    pub crc32s: Vec<u32>,
    pub offsets: Vec<u64>,
    pub lengths: Vec<u32>,
    pub pack_checksum: [u8; 32],
}

/// One row of a [`PackIndex`]: `(handle, crc32, offset, length)`.
pub type IndexRow = (BlobHandle, u32, u64, u32);

impl PackIndex {
    /// Build an index from rows and a pack checksum.
    pub fn build(mut rows: Vec<IndexRow>, pack_checksum: [u8; 32]) -> Self {
        rows.sort_by(|a, b| a.0.cmp(&b.0));

        let mut fan_out = [0u32; 256];
        let mut handles = Vec::with_capacity(rows.len());
        let mut crc32s = Vec::with_capacity(rows.len());
        let mut offsets = Vec::with_capacity(rows.len());
        let mut lengths = Vec::with_capacity(rows.len());

        for (handle, crc, offset, length) in &rows {
            handles.push(*handle);
            crc32s.push(*crc);
            offsets.push(*offset);
            lengths.push(*length);
        }

        // fan_out[i] = count of handles whose id starts with a byte <= i
        for (i, handle) in handles.iter().enumerate() {
            let first_byte = handle.id.as_bytes()[0] as usize;
            for slot in &mut fan_out[first_byte..] {
                *slot = (i + 1) as u32;
            }
        }

        Self {
            fan_out,
            handles,
            crc32s,
            offsets,
            lengths,
            pack_checksum,
        }
    }

    /// ID of the indexed pack.
    pub fn pack_id(&self) -> PackId {
        PackId::from_hash(self.pack_checksum)
    }

    /// Look up the entry holding `handle`.
    pub fn lookup(&self, handle: &BlobHandle) -> Option<PackEntry> {
        let (start, end) = self.bucket(handle.id.as_bytes()[0]);
        let pos = self.handles.get(start..end)?.binary_search(handle).ok()?;
        Some(self.entry(start + pos))
    }

    pub fn blob_count(&self) -> usize {
        self.handles.len()
    }

    /// Range of `handles` whose id starts with `first_byte`.
    fn bucket(&self, first_byte: u8) -> (usize, usize) {
        let i = first_byte as usize;
        let start = if i == 0 { 0 } else { self.fan_out[i - 1] as usize };
        (start, self.fan_out[i] as usize)
    }

    fn entry(&self, i: usize) -> PackEntry {
        PackEntry {
            handle: self.handles[i],
            offset: self.offsets[i],
            length: self.lengths[i],
            crc32: self.crc32s[i],
        }
    }

    /// The pack record described by this index, entries in pack order.
    pub fn to_pack(&self) -> Pack {
        let mut entries: Vec<PackEntry> = (0..self.handles.len()).map(|i| self.entry(i)).collect();
        entries.sort_by_key(|e| e.offset);
        Pack {
            id: self.pack_id(),
            entries,
        }
    }

    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let n = self.handles.len();
        let mut buf = Vec::with_capacity(8 + 1024 + n * (32 + 1 + 4 + 8 + 4) + 32);
        buf.extend_from_slice(INDEX_MAGIC);
        buf.extend_from_slice(&INDEX_VERSION.to_be_bytes());
        for &count in &self.fan_out {
            buf.extend_from_slice(&count.to_be_bytes());
        }
        for handle in &self.handles {
            buf.extend_from_slice(handle.id.as_bytes());
        }
        for handle in &self.handles {
            buf.push(kind_to_byte(handle.kind));
        }
        for &crc in &self.crc32s {
            buf.extend_from_slice(&crc.to_be_bytes());
        }
        for &offset in &self.offsets {
            buf.extend_from_slice(&offset.to_be_bytes());
        }
        for &length in &self.lengths {
            buf.extend_from_slice(&length.to_be_bytes());
        }
        buf.extend_from_slice(&self.pack_checksum);
        buf
    }

    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> PackResult<Self> {
        if data.len() < 8 {
            return Err(PackError::IndexCorrupted("too short".into()));
        }
        if &data[0..4] != INDEX_MAGIC {
            return Err(PackError::InvalidMagic {
                expected: String::from_utf8_lossy(INDEX_MAGIC).into(),
                actual: String::from_utf8_lossy(&data[0..4]).into(),
            });
        }
        let version = read_u32(data, 4);
        if version != INDEX_VERSION {
            return Err(PackError::UnsupportedVersion(version));
        }

        let mut pos = 8;
        if data.len() < pos + 256 * 4 {
            return Err(PackError::IndexCorrupted("fan-out truncated".into()));
        }
        let mut fan_out = [0u32; 256];
        for entry in &mut fan_out {
            *entry = read_u32(data, pos);
            pos += 4;
        }

        if fan_out.windows(2).any(|w| w[0] > w[1]) {
            return Err(PackError::IndexCorrupted("fan-out table decreases".into()));
        }
        let count = fan_out[255] as usize;
        let needed = pos + count * (32 + 1 + 4 + 8 + 4) + 32;
        if data.len() != needed {
            return Err(PackError::IndexCorrupted(format!(
                "expected {needed} bytes for {count} entries, got {}",
                data.len()
            )));
        }

        let mut ids = Vec::with_capacity(count);
        for _ in 0..count {
            let mut hash = [0u8; 32];
            hash.copy_from_slice(&data[pos..pos + 32]);
            ids.push(ObjectId::from_hash(hash));
            pos += 32;
        }

        let mut handles = Vec::with_capacity(count);
        for id in ids {
            let byte = data[pos];
            let kind = kind_from_byte(byte).ok_or_else(|| {
                PackError::IndexCorrupted(format!("unknown type byte {byte} for {id}"))
            })?;
            handles.push(BlobHandle::new(id, kind));
            pos += 1;
        }

        let mut crc32s = Vec::with_capacity(count);
        for _ in 0..count {
            crc32s.push(read_u32(data, pos));
            pos += 4;
        }

        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&data[pos..pos + 8]);
            offsets.push(u64::from_be_bytes(raw));
            pos += 8;
        }

        let mut lengths = Vec::with_capacity(count);
        for _ in 0..count {
            lengths.push(read_u32(data, pos));
            pos += 4;
        }

        let mut pack_checksum = [0u8; 32];
        pack_checksum.copy_from_slice(&data[pos..pos + 32]);

        if handles.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PackError::IndexCorrupted("handles not sorted".into()));
        }

        let index = Self {
            fan_out,
            handles,
            crc32s,
            offsets,
            lengths,
            pack_checksum,
        };
        index.check_entries()?;
        Ok(index)
    }

    /// Every handle sits in its fan-out bucket and every entry could hold
    /// at least a header.
    fn check_entries(&self) -> PackResult<()> {
        for first_byte in 0..=u8::MAX {
            let (start, end) = self.bucket(first_byte);
            if self.handles[start..end]
                .iter()
                .any(|h| h.id.as_bytes()[0] != first_byte)
            {
                return Err(PackError::IndexCorrupted(format!(
                    "fan-out bucket {first_byte:#04x} disagrees with its ids"
                )));
            }
        }
        for i in 0..self.handles.len() {
            let entry = self.entry(i);
            if (entry.length as usize) < MIN_ENTRY_LEN {
                return Err(PackError::IndexCorrupted(format!(
                    "entry for {} is {} bytes long",
                    entry.handle, entry.length
                )));
            }
            if entry.offset < PACK_HEADER_LEN as u64 {
                return Err(PackError::IndexCorrupted(format!(
                    "entry for {} starts inside the pack header",
                    entry.handle
                )));
            }
        }
        Ok(())
    }
}

/// Read a big-endian u32 at `pos`. Callers check bounds first.
fn read_u32(data: &[u8], pos: usize) -> u32 {
    let mut raw = [0u8; 4];
    raw.copy_from_slice(&data[pos..pos + 4]);
    u32::from_be_bytes(raw)
}
