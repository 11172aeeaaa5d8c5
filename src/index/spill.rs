//! Sorted runs of (trigram, file id) pairs and their k-way merge.
//!
//! The writer buffers pairs in memory; once the buffer passes the spill
//! threshold it is sorted and written to an anonymous temp file as a run.
//! At flush time all runs plus the in-memory remainder are merged into one
//! ascending stream, the same way the merge phase of an external sort works.

use crate::index::types::{FileId, Trigram};
use anyhow::{Context, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Read, Seek, SeekFrom, Write};

/// A (trigram, file id) pair packed so that numeric order is (trigram, id) order.
pub type Pair = u64;

#[inline]
pub fn pack_pair(trigram: Trigram, file_id: FileId) -> Pair {
    ((trigram as u64) << 32) | file_id as u64
}

#[inline]
pub fn unpack_pair(pair: Pair) -> (Trigram, FileId) {
    ((pair >> 32) as Trigram, pair as FileId)
}

/// A sorted run spilled to disk.
pub struct SpillRun {
    file: File,
    len: usize,
}

impl SpillRun {
    /// Sort `pairs` and write them to a fresh temp file.
    pub fn write(pairs: &mut Vec<Pair>) -> Result<Self> {
        pairs.sort_unstable();
        pairs.dedup();

        let file = tempfile::tempfile().context("Failed to create spill file")?;
        let mut writer = BufWriter::new(file);
        for &pair in pairs.iter() {
            writer.write_all(&pair.to_le_bytes())?;
        }
        let mut file = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .context("Failed to write spill run")?;
        file.seek(SeekFrom::Start(0))?;

        let len = pairs.len();
        pairs.clear();
        Ok(Self { file, len })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    fn into_source(self) -> RunSource {
        RunSource::Disk(BufReader::new(self.file))
    }
}

/// One input of the merge.
enum RunSource {
    Disk(BufReader<File>),
    Memory(std::vec::IntoIter<Pair>),
}

impl RunSource {
    fn next_pair(&mut self) -> Result<Option<Pair>> {
        match self {
            RunSource::Memory(iter) => Ok(iter.next()),
            RunSource::Disk(reader) => {
                let mut buf = [0u8; 8];
                match reader.read_exact(&mut buf) {
                    Ok(()) => Ok(Some(u64::from_le_bytes(buf))),
                    Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
                    Err(e) => Err(e).context("Failed to read spill run"),
                }
            }
        }
    }
}

/// K-way merge over spilled runs and a final in-memory buffer.
///
/// Yields pairs in ascending order with duplicates removed.
pub struct RunMerger {
    sources: Vec<RunSource>,
    heap: BinaryHeap<Reverse<(Pair, usize)>>,
    last: Option<Pair>,
}

impl RunMerger {
    pub fn new(runs: Vec<SpillRun>, mut memory: Vec<Pair>) -> Result<Self> {
        memory.sort_unstable();
        memory.dedup();

        let mut sources: Vec<RunSource> = runs.into_iter().map(SpillRun::into_source).collect();
        sources.push(RunSource::Memory(memory.into_iter()));

        let mut heap = BinaryHeap::with_capacity(sources.len());
        for (idx, source) in sources.iter_mut().enumerate() {
            if let Some(pair) = source.next_pair()? {
                heap.push(Reverse((pair, idx)));
            }
        }

        Ok(Self {
            sources,
            heap,
            last: None,
        })
    }

    /// Next distinct pair in ascending order, or None when all runs are drained.
    pub fn next_pair(&mut self) -> Result<Option<Pair>> {
        while let Some(Reverse((pair, idx))) = self.heap.pop() {
            if let Some(next) = self.sources[idx].next_pair()? {
                self.heap.push(Reverse((next, idx)));
            }
            if self.last == Some(pair) {
                continue;
            }
            self.last = Some(pair);
            return Ok(Some(pair));
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(mut merger: RunMerger) -> Vec<Pair> {
        let mut out = Vec::new();
        while let Some(pair) = merger.next_pair().unwrap() {
            out.push(pair);
        }
        out
    }

    #[test]
    fn test_pack_order_matches_trigram_then_id() {
        assert!(pack_pair(1, 900) < pack_pair(2, 0));
        assert!(pack_pair(2, 3) < pack_pair(2, 4));
        assert_eq!(unpack_pair(pack_pair(0xABCDEF, 77)), (0xABCDEF, 77));
    }

    #[test]
    fn test_spill_run_sorts_and_clears_buffer() {
        let mut buf = vec![pack_pair(5, 1), pack_pair(1, 2), pack_pair(5, 0)];
        let run = SpillRun::write(&mut buf).unwrap();
        assert!(buf.is_empty());
        assert_eq!(run.len(), 3);
        assert_eq!(
            drain(RunMerger::new(vec![run], Vec::new()).unwrap()),
            vec![pack_pair(1, 2), pack_pair(5, 0), pack_pair(5, 1)]
        );
    }

    #[test]
    fn test_merge_interleaves_runs_and_memory() {
        let mut first = vec![pack_pair(1, 0), pack_pair(3, 0), pack_pair(9, 0)];
        let mut second = vec![pack_pair(1, 1), pack_pair(4, 1)];
        let runs = vec![
            SpillRun::write(&mut first).unwrap(),
            SpillRun::write(&mut second).unwrap(),
        ];
        let memory = vec![pack_pair(3, 2), pack_pair(0, 2)];

        let merged = drain(RunMerger::new(runs, memory).unwrap());
        assert_eq!(
            merged,
            vec![
                pack_pair(0, 2),
                pack_pair(1, 0),
                pack_pair(1, 1),
                pack_pair(3, 0),
                pack_pair(3, 2),
                pack_pair(4, 1),
                pack_pair(9, 0),
            ]
        );
    }

    #[test]
    fn test_merge_drops_duplicates_across_runs() {
        let mut run = vec![pack_pair(2, 2)];
        let runs = vec![SpillRun::write(&mut run).unwrap()];
        let merged = drain(RunMerger::new(runs, vec![pack_pair(2, 2)]).unwrap());
        assert_eq!(merged, vec![pack_pair(2, 2)]);
    }

    #[test]
    fn test_merge_empty() {
        assert!(drain(RunMerger::new(Vec::new(), Vec::new()).unwrap()).is_empty());
    }
}
