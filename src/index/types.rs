use serde::{Deserialize, Serialize};

/// Dense, zero-based identifier for an indexed file
pub type FileId = u32;

/// A trigram is a 3-byte sequence stored as u32 (only lower 24 bits used)
pub type Trigram = u32;

/// Number of distinct trigram values (24-bit space)
pub const TRIGRAM_SPACE: u32 = 1 << 24;

/// Configuration for the index builder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Lines are cut to this many bytes before trigrams are taken.
    /// The verification pass applies the same cut, so it is stored in the index.
    pub max_line_len: usize,
    /// Number of (trigram, file) pairs held in memory before a sorted run is spilled
    pub spill_threshold: usize,
    /// Files larger than this are skipped
    pub max_file_size: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_line_len: 1000,
            spill_threshold: 1 << 22,
            max_file_size: 1 << 30,
        }
    }
}

/// Convert 3 bytes to a trigram
#[inline]
pub fn bytes_to_trigram(b0: u8, b1: u8, b2: u8) -> Trigram {
    ((b0 as u32) << 16) | ((b1 as u32) << 8) | (b2 as u32)
}

/// Convert trigram back to bytes
#[inline]
pub fn trigram_to_bytes(t: Trigram) -> [u8; 3] {
    [
        ((t >> 16) & 0xFF) as u8,
        ((t >> 8) & 0xFF) as u8,
        (t & 0xFF) as u8,
    ]
}
