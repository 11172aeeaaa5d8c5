use crate::index::types::{TRIGRAM_SPACE, Trigram, bytes_to_trigram};
use memchr::memchr_iter;
use std::borrow::Cow;

/// Bitset for tracking which trigrams have been seen.
/// Uses 2MB to cover all 16M possible trigram values (24 bits).
struct TrigramBitset {
    bits: Vec<u64>,
}

impl TrigramBitset {
    /// Create a new bitset (2MB allocation, zeroed)
    #[inline]
    fn new() -> Self {
        Self {
            bits: vec![0u64; (TRIGRAM_SPACE / 64) as usize],
        }
    }

    /// Check if trigram is set and set it. Returns true if it was already set.
    #[inline]
    fn test_and_set(&mut self, trigram: Trigram) -> bool {
        let idx = (trigram >> 6) as usize; // divide by 64
        let bit = 1u64 << (trigram & 63); // mod 64
        let was_set = (self.bits[idx] & bit) != 0;
        self.bits[idx] |= bit;
        was_set
    }

    /// Collect all set trigrams into an ascending vector
    fn collect(&self) -> Vec<Trigram> {
        let mut result = Vec::with_capacity(8192);
        for (word_idx, &word) in self.bits.iter().enumerate() {
            if word == 0 {
                continue;
            }
            let base = (word_idx as u32) << 6;
            let mut w = word;
            while w != 0 {
                let bit_pos = w.trailing_zeros();
                result.push(base | bit_pos);
                w &= w - 1; // clear lowest set bit
            }
        }
        result
    }
}

/// Extract the distinct trigrams of `content`, ascending.
///
/// Callers pass the searchable view (see [`searchable_view`]), never the raw
/// file, so that long-line truncation is applied identically at build and
/// verification time.
pub fn extract_trigrams(content: &[u8]) -> Vec<Trigram> {
    if content.len() < 3 {
        return Vec::new();
    }

    // For small files, use simple sort+dedup (more cache-friendly than bitset)
    if content.len() < 1024 {
        return literal_trigrams(content);
    }

    let mut bitset = TrigramBitset::new();
    for window in content.windows(3) {
        bitset.test_and_set(bytes_to_trigram(window[0], window[1], window[2]));
    }

    bitset.collect()
}

/// Sorted, deduplicated trigrams of a short byte string (query literals)
pub fn literal_trigrams(bytes: &[u8]) -> Vec<Trigram> {
    let mut trigrams: Vec<Trigram> = bytes
        .windows(3)
        .map(|w| bytes_to_trigram(w[0], w[1], w[2]))
        .collect();
    trigrams.sort_unstable();
    trigrams.dedup();
    trigrams
}

/// The part of `content` that is indexed and searched.
///
/// Every line is cut to at most `max_line_len` bytes; newlines are kept so
/// line numbers do not shift. A limit of 0 disables the cut.
pub fn searchable_view(content: &[u8], max_line_len: usize) -> Cow<'_, [u8]> {
    if max_line_len == 0 || !has_long_line(content, max_line_len) {
        return Cow::Borrowed(content);
    }

    let mut view = Vec::with_capacity(content.len());
    for line in content.split_inclusive(|&b| b == b'\n') {
        let (body, newline) = match line.split_last() {
            Some((b'\n', body)) => (body, true),
            _ => (line, false),
        };
        view.extend_from_slice(&body[..body.len().min(max_line_len)]);
        if newline {
            view.push(b'\n');
        }
    }
    Cow::Owned(view)
}

fn has_long_line(content: &[u8], max_line_len: usize) -> bool {
    let mut start = 0;
    for nl in memchr_iter(b'\n', content) {
        if nl - start > max_line_len {
            return true;
        }
        start = nl + 1;
    }
    content.len() - start > max_line_len
}

/// Check if content is text worth indexing: no NUL bytes and valid UTF-8.
///
/// Files failing this are never indexed and therefore never reported.
pub fn is_text(content: &[u8]) -> bool {
    memchr::memchr(0, content).is_none() && std::str::from_utf8(content).is_ok()
}
