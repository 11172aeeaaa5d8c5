use crate::index::format::{
    DIR_ENTRY_SIZE, DirEntry, IndexTrailer, MAGIC, NAME_INDEX_ENTRY_SIZE, TRAILER_SIZE, VERSION,
};
use crate::index::posting;
use crate::index::types::*;
use crate::query::{Query, QueryExecutor};
use crate::utils::{decode_varint, delta_decode, read_u32_at, read_u64_at};
use anyhow::{Context, Result, bail};
use memmap2::Mmap;
use std::cmp::Ordering;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Memory-mapped, read-only view of a finished index file.
///
/// Nothing is decoded up front: names and posting lists are read from the
/// mapping on demand, so opening is O(1) in the size of the index. The
/// reader is `Sync`; any number of threads may query one handle.
pub struct IndexReader {
    index_path: PathBuf,
    data: Mmap,
    trailer: IndexTrailer,
}

impl IndexReader {
    /// Open and validate an index file
    pub fn open(index_path: &Path) -> Result<Self> {
        let file = File::open(index_path)
            .with_context(|| format!("Failed to open index {}", index_path.display()))?;
        let len = file.metadata()?.len();
        if len < (MAGIC.len() + TRAILER_SIZE) as u64 {
            bail!("corrupt index {}: truncated ({} bytes)", index_path.display(), len);
        }

        // The file is never modified after the atomic rename that published it.
        let data = unsafe { Mmap::map(&file)? };

        if data[..MAGIC.len()] != MAGIC {
            bail!("corrupt index {}: bad magic", index_path.display());
        }
        let trailer = IndexTrailer::from_bytes(&data[data.len() - TRAILER_SIZE..])
            .with_context(|| format!("corrupt index {}: bad trailer", index_path.display()))?;
        if trailer.version != VERSION {
            bail!(
                "index {} has version {}, expected {}; rebuild it",
                index_path.display(),
                trailer.version,
                VERSION
            );
        }
        validate_layout(&trailer, data.len() as u64)
            .with_context(|| format!("corrupt index {}", index_path.display()))?;

        Ok(Self {
            index_path: index_path.to_path_buf(),
            data,
            trailer,
        })
    }

    /// Path the index was opened from
    pub fn path(&self) -> &Path {
        &self.index_path
    }

    /// Number of indexed files; valid ids are `0..file_count`
    pub fn file_count(&self) -> u32 {
        self.trailer.file_count
    }

    /// Number of distinct trigrams with a posting list
    pub fn trigram_count(&self) -> u32 {
        self.trailer.trigram_count
    }

    /// Line cut applied at build time; verification must apply the same cut
    pub fn max_line_len(&self) -> usize {
        self.trailer.max_line_len as usize
    }

    /// Root paths recorded with `add_paths`, in build order
    pub fn roots(&self) -> Result<Vec<&str>> {
        let mut pos = self.trailer.roots_offset as usize;
        let end = self.trailer.names_offset as usize;
        let mut roots = Vec::with_capacity(self.trailer.root_count as usize);
        for _ in 0..self.trailer.root_count {
            let (root, next) = self.read_string(pos, end)?;
            roots.push(root);
            pos = next;
        }
        Ok(roots)
    }

    /// Path of `file_id`. An id outside the index means the index is corrupt.
    pub fn name(&self, file_id: FileId) -> Result<&str> {
        if file_id >= self.trailer.file_count {
            bail!(
                "corrupt index: file id {} out of range ({} files)",
                file_id,
                self.trailer.file_count
            );
        }
        let slot = self.trailer.name_index_offset as usize + file_id as usize * NAME_INDEX_ENTRY_SIZE;
        let offset = read_u64_at(&self.data, slot).context("corrupt index: name index")?;
        let start = (self.trailer.names_offset as usize).saturating_add(offset as usize);
        let (name, _) = self.read_string(start, self.trailer.name_index_offset as usize)?;
        Ok(name)
    }

    /// File ids containing `trigram`, ascending. Empty if it never occurs.
    pub fn posting_list(&self, trigram: Trigram) -> Result<Vec<FileId>> {
        let Some(entry) = self.lookup(trigram)? else {
            return Ok(Vec::new());
        };

        let start = (self.trailer.postings_offset as usize).saturating_add(entry.offset as usize);
        let end = start.saturating_add(entry.length as usize);
        if end > self.trailer.directory_offset as usize {
            bail!("corrupt index: posting list for {:06x} out of bounds", trigram);
        }

        let ids = delta_decode(&self.data[start..end], entry.count as usize)
            .with_context(|| format!("corrupt index: bad posting list for {:06x}", trigram))?;
        if ids.last().is_some_and(|&id| id >= self.trailer.file_count) {
            bail!("corrupt index: posting list for {:06x} names a missing file", trigram);
        }
        Ok(ids)
    }

    /// `list` AND the posting list of `trigram`
    pub fn posting_and(&self, list: &[FileId], trigram: Trigram) -> Result<Vec<FileId>> {
        if list.is_empty() {
            return Ok(Vec::new());
        }
        Ok(posting::intersect(list, &self.posting_list(trigram)?))
    }

    /// `list` OR the posting list of `trigram`
    pub fn posting_or(&self, list: &[FileId], trigram: Trigram) -> Result<Vec<FileId>> {
        Ok(posting::union(list, &self.posting_list(trigram)?))
    }

    /// Every file id in the index, ascending
    pub fn all_files(&self) -> Vec<FileId> {
        (0..self.trailer.file_count).collect()
    }

    /// Evaluate a compiled query to its candidate files
    pub fn posting_query(&self, query: &Query) -> Result<Vec<FileId>> {
        QueryExecutor::new(self).execute(query)
    }

    /// Binary search the fixed-size directory for `trigram`
    fn lookup(&self, trigram: Trigram) -> Result<Option<DirEntry>> {
        let base = self.trailer.directory_offset as usize;
        let (mut lo, mut hi) = (0usize, self.trailer.trigram_count as usize);

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let at = base + mid * DIR_ENTRY_SIZE;
            let key = read_u32_at(&self.data, at).context("corrupt index: directory")?;
            match key.cmp(&trigram) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => {
                    let entry = DirEntry::from_bytes(&self.data[at..])
                        .context("corrupt index: directory entry")?;
                    return Ok(Some(entry));
                }
            }
        }

        Ok(None)
    }

    /// Read a varint-length-prefixed string at `pos` that must end before `limit`.
    /// Returns the string and the position after it.
    fn read_string(&self, pos: usize, limit: usize) -> Result<(&str, usize)> {
        let limit = limit.min(self.data.len());
        if pos >= limit {
            bail!("corrupt index: string at {} past end of table", pos);
        }
        let (len, consumed) =
            decode_varint(&self.data[pos..limit]).context("corrupt index: string length")?;
        let start = pos + consumed;
        let end = start.saturating_add(len as usize);
        if end > limit {
            bail!("corrupt index: string at {} overruns its table", pos);
        }
        let s = std::str::from_utf8(&self.data[start..end])
            .context("corrupt index: path is not UTF-8")?;
        Ok((s, end))
    }
}

/// Check that the trailer's sections are ordered, sized and inside the file.
fn validate_layout(t: &IndexTrailer, file_len: u64) -> Result<()> {
    let body_end = file_len - TRAILER_SIZE as u64;
    let ordered = MAGIC.len() as u64 <= t.roots_offset
        && t.roots_offset <= t.names_offset
        && t.names_offset <= t.name_index_offset
        && t.name_index_offset <= t.postings_offset
        && t.postings_offset <= t.directory_offset
        && t.directory_offset <= body_end;
    if !ordered {
        bail!("sections out of order");
    }

    let name_index_len = t.file_count as u64 * NAME_INDEX_ENTRY_SIZE as u64;
    if t.name_index_offset + name_index_len != t.postings_offset {
        bail!("name index size does not match file count {}", t.file_count);
    }

    let directory_len = t.trigram_count as u64 * DIR_ENTRY_SIZE as u64;
    if t.directory_offset + directory_len != body_end {
        bail!("directory size does not match trigram count {}", t.trigram_count);
    }

    Ok(())
}
