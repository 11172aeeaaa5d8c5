//! Binary layout of a regrep index file.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ magic "RGRPIDX1"                              │
//! ├──────────────────────────────────────────────┤
//! │ Root table   root_count × (varint len, bytes) │
//! │ Name table   file_count × (varint len, bytes) │
//! │ Name index   file_count × u64 offset          │
//! ├──────────────────────────────────────────────┤
//! │ Posting lists, ascending trigram order,       │
//! │ gap-encoded varints                           │
//! ├──────────────────────────────────────────────┤
//! │ Directory    trigram_count × 20-byte entries  │
//! ├──────────────────────────────────────────────┤
//! │ Trailer (68 bytes) ending in "RGRPEND1"       │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! All fixed-width integers are little-endian. Offsets in the trailer are
//! absolute; directory offsets are relative to the start of the postings.

use crate::index::types::Trigram;
use crate::utils::{read_u32_at, read_u64_at};

/// Magic bytes at the start of an index file.
pub const MAGIC: [u8; 8] = *b"RGRPIDX1";

/// Magic bytes closing the trailer.
pub const TRAILER_MAGIC: [u8; 8] = *b"RGRPEND1";

/// Current format version.
pub const VERSION: u32 = 1;

/// Trailer size in bytes (fixed).
pub const TRAILER_SIZE: usize = 68;

/// Directory entry: trigram (u32) + offset (u64) + length (u32) + count (u32).
pub const DIR_ENTRY_SIZE: usize = 20;

/// Name index entry: offset (u64) into the name table.
pub const NAME_INDEX_ENTRY_SIZE: usize = 8;

/// Section offsets and counts, written last so the writer can stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexTrailer {
    pub roots_offset: u64,
    pub root_count: u32,
    pub names_offset: u64,
    pub name_index_offset: u64,
    pub file_count: u32,
    pub postings_offset: u64,
    pub directory_offset: u64,
    pub trigram_count: u32,
    pub max_line_len: u32,
    pub version: u32,
}

impl IndexTrailer {
    /// Serialize the trailer to its fixed 68-byte form.
    pub fn to_bytes(&self) -> [u8; TRAILER_SIZE] {
        let mut buf = [0u8; TRAILER_SIZE];
        buf[0..8].copy_from_slice(&self.roots_offset.to_le_bytes());
        buf[8..12].copy_from_slice(&self.root_count.to_le_bytes());
        buf[12..20].copy_from_slice(&self.names_offset.to_le_bytes());
        buf[20..28].copy_from_slice(&self.name_index_offset.to_le_bytes());
        buf[28..32].copy_from_slice(&self.file_count.to_le_bytes());
        buf[32..40].copy_from_slice(&self.postings_offset.to_le_bytes());
        buf[40..48].copy_from_slice(&self.directory_offset.to_le_bytes());
        buf[48..52].copy_from_slice(&self.trigram_count.to_le_bytes());
        buf[52..56].copy_from_slice(&self.max_line_len.to_le_bytes());
        buf[56..60].copy_from_slice(&self.version.to_le_bytes());
        buf[60..68].copy_from_slice(&TRAILER_MAGIC);
        buf
    }

    /// Parse a trailer. Returns None if the slice is short or the magic is wrong.
    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < TRAILER_SIZE || data[60..68] != TRAILER_MAGIC {
            return None;
        }

        Some(IndexTrailer {
            roots_offset: read_u64_at(data, 0)?,
            root_count: read_u32_at(data, 8)?,
            names_offset: read_u64_at(data, 12)?,
            name_index_offset: read_u64_at(data, 20)?,
            file_count: read_u32_at(data, 28)?,
            postings_offset: read_u64_at(data, 32)?,
            directory_offset: read_u64_at(data, 40)?,
            trigram_count: read_u32_at(data, 48)?,
            max_line_len: read_u32_at(data, 52)?,
            version: read_u32_at(data, 56)?,
        })
    }
}

/// One directory entry locating a posting list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub trigram: Trigram,
    pub offset: u64,
    pub length: u32,
    pub count: u32,
}

impl DirEntry {
    pub fn to_bytes(&self) -> [u8; DIR_ENTRY_SIZE] {
        let mut buf = [0u8; DIR_ENTRY_SIZE];
        buf[0..4].copy_from_slice(&self.trigram.to_le_bytes());
        buf[4..12].copy_from_slice(&self.offset.to_le_bytes());
        buf[12..16].copy_from_slice(&self.length.to_le_bytes());
        buf[16..20].copy_from_slice(&self.count.to_le_bytes());
        buf
    }

    pub fn from_bytes(data: &[u8]) -> Option<Self> {
        Some(DirEntry {
            trigram: read_u32_at(data, 0)?,
            offset: read_u64_at(data, 4)?,
            length: read_u32_at(data, 12)?,
            count: read_u32_at(data, 16)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_trailer() -> IndexTrailer {
        IndexTrailer {
            roots_offset: 8,
            root_count: 2,
            names_offset: 30,
            name_index_offset: 120,
            file_count: 11,
            postings_offset: 208,
            directory_offset: 4000,
            trigram_count: 95,
            max_line_len: 1000,
            version: VERSION,
        }
    }

    #[test]
    fn test_trailer_roundtrip() {
        let bytes = sample_trailer().to_bytes();
        assert_eq!(&bytes[60..], &TRAILER_MAGIC);
        assert_eq!(IndexTrailer::from_bytes(&bytes), Some(sample_trailer()));
    }

    #[test]
    fn test_trailer_invalid_magic() {
        let mut bytes = sample_trailer().to_bytes();
        bytes[67] = b'X';
        assert!(IndexTrailer::from_bytes(&bytes).is_none());
    }

    #[test]
    fn test_trailer_too_short() {
        assert!(IndexTrailer::from_bytes(&[0u8; 10]).is_none());
    }

    #[test]
    fn test_dir_entry_layout() {
        let entry = DirEntry {
            trigram: 0x536561,
            offset: 17,
            length: 3,
            count: 2,
        };
        let bytes = entry.to_bytes();
        assert_eq!(&bytes[0..4], &[0x61, 0x65, 0x53, 0x00]);
        assert_eq!(DirEntry::from_bytes(&bytes), Some(entry));
    }
}
