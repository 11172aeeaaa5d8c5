use crate::index::format::{DirEntry, IndexTrailer, MAGIC, VERSION};
use crate::index::spill::{Pair, RunMerger, SpillRun, pack_pair, unpack_pair};
use crate::index::types::*;
use crate::utils::{
    delta_encode, encode_varint, extract_trigrams, is_text, searchable_view, write_u64_le,
};
use anyhow::{Context, Result, bail};
use std::fs;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// What a finished build wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSummary {
    pub file_count: u32,
    pub trigram_count: u32,
    pub bytes: u64,
}

/// Index writer: assigns file ids, buffers (trigram, file) pairs with
/// bounded memory, and writes the final index file on [`IndexWriter::flush`].
pub struct IndexWriter {
    index_path: PathBuf,
    config: IndexConfig,
    roots: Vec<String>,
    names: Vec<String>,
    /// Pairs not yet spilled
    buffer: Vec<Pair>,
    runs: Vec<SpillRun>,
}

impl IndexWriter {
    /// Start a build that will replace `index_path` when flushed.
    ///
    /// Nothing touches the filesystem until the first spill or the flush.
    pub fn create(index_path: &Path, config: IndexConfig) -> Self {
        Self {
            index_path: index_path.to_path_buf(),
            config,
            roots: Vec::new(),
            names: Vec::new(),
            buffer: Vec::new(),
            runs: Vec::new(),
        }
    }

    /// Record the root paths this index covers (already sorted by the caller).
    pub fn add_paths<I, S>(&mut self, roots: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.roots
            .extend(roots.into_iter().map(|r| r.as_ref().to_string()));
    }

    /// Index a file from disk.
    ///
    /// Unreadable, oversized and non-text files are skipped and get no id.
    pub fn add_file(&mut self, path: &Path) -> Result<Option<FileId>> {
        match read_file(path, self.config.max_file_size) {
            Some(content) => self.add_content(&path.to_string_lossy(), &content),
            None => Ok(None),
        }
    }

    /// Index the contents of `reader` under `name`.
    pub fn add<R: Read>(&mut self, name: &str, mut reader: R) -> Result<Option<FileId>> {
        let mut content = Vec::new();
        if let Err(e) = reader.read_to_end(&mut content) {
            warn!("{}: {}", name, e);
            return Ok(None);
        }
        self.add_content(name, &content)
    }

    /// Index in-memory content under `name`.
    pub fn add_content(&mut self, name: &str, content: &[u8]) -> Result<Option<FileId>> {
        match content_trigrams(content, &self.config) {
            Some(trigrams) => self.add_trigrams(name, &trigrams).map(Some),
            None => {
                debug!("{}: not text, skipping", name);
                Ok(None)
            }
        }
    }

    /// Assign the next file id to `name` and record its (already extracted) trigrams.
    pub fn add_trigrams(&mut self, name: &str, trigrams: &[Trigram]) -> Result<FileId> {
        if self.names.len() >= u32::MAX as usize {
            bail!("too many files for one index");
        }
        let file_id = self.names.len() as FileId;
        self.names.push(name.to_string());

        for &trigram in trigrams {
            self.buffer.push(pack_pair(trigram, file_id));
        }

        if self.buffer.len() >= self.config.spill_threshold.max(1) {
            self.spill()?;
        }

        Ok(file_id)
    }

    /// Number of files assigned an id so far
    pub fn file_count(&self) -> usize {
        self.names.len()
    }

    fn spill(&mut self) -> Result<()> {
        let run = SpillRun::write(&mut self.buffer)?;
        debug!("spilled run {} ({} pairs)", self.runs.len() + 1, run.len());
        self.runs.push(run);
        Ok(())
    }

    /// Merge all runs and write the index, replacing `index_path` atomically.
    ///
    /// On any error the temp file is removed and the previous index (if any)
    /// stays in place.
    pub fn flush(mut self) -> Result<IndexSummary> {
        let dir = match self.index_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let mut tmp = NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temp index in {}", dir.display()))?;

        let summary = {
            let mut out = SectionWriter::new(BufWriter::new(tmp.as_file_mut()));
            let summary = self.write_sections(&mut out)?;
            out.finish()?;
            summary
        };
        tmp.as_file().sync_all()?;

        tmp.persist(&self.index_path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to write {}", self.index_path.display()))?;

        info!(
            "wrote {}: {} files, {} trigrams, {} bytes",
            self.index_path.display(),
            summary.file_count,
            summary.trigram_count,
            summary.bytes
        );
        Ok(summary)
    }

    fn write_sections<W: Write>(&mut self, out: &mut SectionWriter<W>) -> Result<IndexSummary> {
        out.write(&MAGIC)?;

        // Root table
        let roots_offset = out.pos;
        for root in &self.roots {
            out.write_string(root)?;
        }

        // Name table + name index
        let names_offset = out.pos;
        let mut name_offsets = Vec::with_capacity(self.names.len());
        for name in &self.names {
            name_offsets.push(out.pos - names_offset);
            out.write_string(name)?;
        }
        let name_index_offset = out.pos;
        for offset in name_offsets {
            out.write_u64(offset)?;
        }

        // Posting lists
        let postings_offset = out.pos;
        let directory = self.write_postings(out, postings_offset)?;

        // Directory
        let directory_offset = out.pos;
        for entry in &directory {
            out.write(&entry.to_bytes())?;
        }

        let trailer = IndexTrailer {
            roots_offset,
            root_count: self.roots.len() as u32,
            names_offset,
            name_index_offset,
            file_count: self.names.len() as u32,
            postings_offset,
            directory_offset,
            trigram_count: directory.len() as u32,
            max_line_len: self.config.max_line_len.min(u32::MAX as usize) as u32,
            version: VERSION,
        };
        out.write(&trailer.to_bytes())?;

        Ok(IndexSummary {
            file_count: trailer.file_count,
            trigram_count: trailer.trigram_count,
            bytes: out.pos,
        })
    }

    fn write_postings<W: Write>(
        &mut self,
        out: &mut SectionWriter<W>,
        postings_offset: u64,
    ) -> Result<Vec<DirEntry>> {
        let runs = std::mem::take(&mut self.runs);
        let memory = std::mem::take(&mut self.buffer);
        let mut merger = RunMerger::new(runs, memory)?;

        let mut directory = Vec::new();
        let mut current: Option<Trigram> = None;
        let mut ids: Vec<FileId> = Vec::new();
        let mut encoded = Vec::new();

        loop {
            let next = merger.next_pair()?.map(unpack_pair);
            let boundary = match (current, next) {
                (Some(t), Some((n, _))) => t != n,
                (Some(_), None) => true,
                (None, _) => false,
            };

            if boundary {
                if let Some(trigram) = current {
                    encoded.clear();
                    delta_encode(&ids, &mut encoded);
                    directory.push(DirEntry {
                        trigram,
                        offset: out.pos - postings_offset,
                        length: encoded.len() as u32,
                        count: ids.len() as u32,
                    });
                    out.write(&encoded)?;
                    ids.clear();
                }
            }

            match next {
                Some((trigram, file_id)) => {
                    current = Some(trigram);
                    ids.push(file_id);
                }
                None => break,
            }
        }

        Ok(directory)
    }
}

/// Read a file for indexing. Unreadable and oversized files yield None.
pub(crate) fn read_file(path: &Path, max_file_size: u64) -> Option<Vec<u8>> {
    let size = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) => {
            warn!("{}: {}", path.display(), e);
            return None;
        }
    };
    if size > max_file_size {
        warn!("{}: too large ({} bytes), skipping", path.display(), size);
        return None;
    }
    match fs::read(path) {
        Ok(content) => Some(content),
        Err(e) => {
            warn!("{}: {}", path.display(), e);
            None
        }
    }
}

/// Trigrams of the searchable view of `content`, or None if it is not text.
pub(crate) fn content_trigrams(content: &[u8], config: &IndexConfig) -> Option<Vec<Trigram>> {
    if !is_text(content) {
        return None;
    }
    let view = searchable_view(content, config.max_line_len);
    Some(extract_trigrams(&view))
}

/// Buffered writer that tracks the absolute offset of the next byte.
struct SectionWriter<W: Write> {
    inner: W,
    pos: u64,
}

impl<W: Write> SectionWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, pos: 0 }
    }

    fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.pos += bytes.len() as u64;
        Ok(())
    }

    fn write_string(&mut self, s: &str) -> Result<()> {
        let mut len = Vec::with_capacity(5);
        encode_varint(s.len() as u32, &mut len);
        self.write(&len)?;
        self.write(s.as_bytes())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        write_u64_le(&mut self.inner, value)?;
        self.pos += 8;
        Ok(())
    }

    fn finish(mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::reader::IndexReader;
    use tempfile::TempDir;

    fn tri(s: &[u8; 3]) -> Trigram {
        bytes_to_trigram(s[0], s[1], s[2])
    }

    #[test]
    fn test_skips_non_text_without_consuming_an_id() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("index");
        let mut writer = IndexWriter::create(&out, IndexConfig::default());

        assert_eq!(writer.add_content("a.txt", b"alpha").unwrap(), Some(0));
        assert_eq!(writer.add_content("b.bin", b"al\x00pha").unwrap(), None);
        assert_eq!(writer.add_content("c.txt", b"alphabet").unwrap(), Some(1));
        assert_eq!(writer.file_count(), 2);

        let summary = writer.flush().unwrap();
        assert_eq!(summary.file_count, 2);

        let reader = IndexReader::open(&out).unwrap();
        assert_eq!(reader.name(1).unwrap(), "c.txt");
        assert_eq!(reader.posting_list(tri(b"alp")).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_spilled_runs_produce_same_index() {
        let dir = TempDir::new().unwrap();
        let docs: Vec<String> = (0..40)
            .map(|i| format!("document {} shares words with doc {}", i, i % 7))
            .collect();

        let build = |path: &Path, threshold: usize| {
            let config = IndexConfig {
                spill_threshold: threshold,
                ..IndexConfig::default()
            };
            let mut writer = IndexWriter::create(path, config);
            for (i, doc) in docs.iter().enumerate() {
                writer.add_content(&format!("doc{}", i), doc.as_bytes()).unwrap();
            }
            writer.flush().unwrap()
        };

        let spilled = dir.path().join("spilled");
        let in_memory = dir.path().join("in_memory");
        build(&spilled, 16);
        build(&in_memory, usize::MAX);

        assert_eq!(fs::read(&spilled).unwrap(), fs::read(&in_memory).unwrap());
    }

    #[test]
    fn test_add_file_skips_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut writer = IndexWriter::create(&dir.path().join("index"), IndexConfig::default());
        assert_eq!(writer.add_file(&dir.path().join("missing.txt")).unwrap(), None);
        assert_eq!(writer.file_count(), 0);
    }

    #[test]
    fn test_long_lines_are_cut_before_indexing() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("index");
        let config = IndexConfig {
            max_line_len: 4,
            ..IndexConfig::default()
        };
        let mut writer = IndexWriter::create(&out, config);
        writer.add_content("long", b"abcdefgh\nxyz").unwrap();
        writer.flush().unwrap();

        let reader = IndexReader::open(&out).unwrap();
        assert_eq!(reader.max_line_len(), 4);
        assert_eq!(reader.posting_list(tri(b"bcd")).unwrap(), vec![0]);
        assert!(reader.posting_list(tri(b"cde")).unwrap().is_empty());
        assert_eq!(reader.posting_list(tri(b"d\nx")).unwrap(), vec![0]);
    }

    #[test]
    fn test_flush_failure_leaves_previous_index() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("index");
        let mut writer = IndexWriter::create(&out, IndexConfig::default());
        writer.add_content("one", b"first build").unwrap();
        writer.flush().unwrap();
        let before = fs::read(&out).unwrap();

        // The old index file sits where the new parent directory should be.
        let blocked = out.join("nested").join("index");
        let mut writer = IndexWriter::create(&blocked, IndexConfig::default());
        writer.add_content("two", b"second build").unwrap();
        assert!(writer.flush().is_err());

        assert_eq!(fs::read(&out).unwrap(), before);
    }
}
