use crate::index::types::{IndexConfig, Trigram};
use crate::index::writer::{IndexSummary, IndexWriter, content_trigrams, read_file};
use crate::utils::progress::{file_bar, spinner};
use anyhow::Result;
use ignore::WalkBuilder;
use rayon::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Name under which standard input is indexed and reported
pub const STDIN_NAME: &str = "/dev/console/stdin";

/// Result of scanning one file (computed in parallel)
struct ScannedFile {
    name: String,
    /// None when the file is skipped and gets no id
    trigrams: Option<Vec<Trigram>>,
}

fn scan_file(path: &Path, config: &IndexConfig) -> ScannedFile {
    let trigrams = read_file(path, config.max_file_size).and_then(|content| {
        let trigrams = content_trigrams(&content, config);
        if trigrams.is_none() {
            debug!("{}: not text, skipping", path.display());
        }
        trigrams
    });
    ScannedFile {
        name: path.to_string_lossy().into_owned(),
        trigrams,
    }
}

/// Files scanned per rayon worker in one batch
const FILES_PER_THREAD: usize = 4;

/// Upper bound on scanned files held in memory at once
fn batch_len() -> usize {
    rayon::current_num_threads().max(1) * FILES_PER_THREAD
}

/// Scan `files` on the rayon pool one bounded batch at a time, handing each
/// result to `sink` in input order. Returns the most scanned files held at once.
fn scan_in_batches<F>(files: &[PathBuf], config: &IndexConfig, mut sink: F) -> Result<usize>
where
    F: FnMut(ScannedFile) -> Result<()>,
{
    let mut peak = 0;
    for chunk in files.chunks(batch_len()) {
        let scanned: Vec<ScannedFile> = chunk.par_iter().map(|path| scan_file(path, config)).collect();
        peak = peak.max(scanned.len());
        for file in scanned {
            sink(file)?;
        }
    }
    Ok(peak)
}

/// Editor backups, temporaries and hidden entries are never indexed
pub fn is_skipped_name(name: &str) -> bool {
    name.starts_with(['.', '#', '~']) || name.ends_with('~')
}

/// Make command-line targets absolute, then sort and dedup them
pub fn resolve_roots(targets: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = targets
        .iter()
        .filter_map(|target| match std::path::absolute(target) {
            Ok(abs) => {
                info!("including {}: {}", target.display(), abs.display());
                Some(abs)
            }
            Err(e) => {
                warn!("{}: {}", target.display(), e);
                None
            }
        })
        .collect();
    roots.sort();
    roots.dedup();
    roots
}

/// Regular files under `roots`, each root walked in file-name order.
///
/// Symlinks are not followed. Ignore files are not consulted.
pub fn collect_files(roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for root in roots {
        info!("index {}", root.display());
        let walker = WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(|entry| {
                entry.depth() == 0 || !is_skipped_name(&entry.file_name().to_string_lossy())
            })
            .build();

        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_some_and(|ft| ft.is_file()) => {
                    files.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => warn!("{}", e),
            }
        }
    }

    files
}

/// Build the index for `roots` at `index_path`, replacing any existing index.
///
/// Files are scanned in parallel in bounded batches and written in walk
/// order, so the same tree always produces the same index.
pub fn build_index(
    index_path: &Path,
    roots: &[PathBuf],
    config: &IndexConfig,
    show_progress: bool,
) -> Result<IndexSummary> {
    let discover = spinner(show_progress, "Discovering files...");
    let files = collect_files(roots);
    let total = files.len();
    if let Some(sp) = discover {
        sp.finish_with_message(format!("Found {} files", total));
    }
    debug!("scanning {} files", total);

    let mut writer = IndexWriter::create(index_path, config.clone());
    writer.add_paths(roots.iter().map(|r| r.to_string_lossy()));

    let bar = file_bar(show_progress, total as u64);
    let peak = scan_in_batches(&files, config, |file| {
        if let Some(trigrams) = file.trigrams {
            writer.add_trigrams(&file.name, &trigrams)?;
        }
        if let Some(ref pb) = bar {
            pb.inc(1);
        }
        Ok(())
    })?;
    debug!("at most {} scanned files held before writing", peak);

    if let Some(pb) = bar {
        pb.finish_with_message(format!("Indexed {} of {} files", writer.file_count(), total));
    }

    let finalize = spinner(show_progress, "Writing index...");
    let summary = writer.flush()?;
    if let Some(sp) = finalize {
        sp.finish_with_message("Index complete");
    }
    Ok(summary)
}

/// Build a single-file index from `reader`, stored under `name`
pub fn build_from_reader<R: Read>(
    index_path: &Path,
    name: &str,
    reader: R,
    config: &IndexConfig,
) -> Result<IndexSummary> {
    let mut writer = IndexWriter::create(index_path, config.clone());
    writer.add(name, reader)?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::reader::IndexReader;
    use crate::index::types::bytes_to_trigram;
    use std::fs;
    use tempfile::TempDir;

    fn tree(dir: &TempDir) -> PathBuf {
        let root = dir.path().join("src");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("b.txt"), "beta text").unwrap();
        fs::write(root.join("a.txt"), "alpha text").unwrap();
        fs::write(root.join("sub/c.txt"), "gamma text").unwrap();
        fs::write(root.join(".hidden"), "hidden text").unwrap();
        fs::write(root.join(".git/config"), "git text").unwrap();
        fs::write(root.join("#scratch#"), "scratch text").unwrap();
        fs::write(root.join("a.txt~"), "backup text").unwrap();
        fs::write(root.join("bin.dat"), b"\x00\x01binary").unwrap();
        root
    }

    #[test]
    fn test_skipped_names() {
        assert!(is_skipped_name(".git"));
        assert!(is_skipped_name("#autosave#"));
        assert!(is_skipped_name("~lock"));
        assert!(is_skipped_name("notes.txt~"));
        assert!(!is_skipped_name("main.rs"));
    }

    #[test]
    fn test_collect_files_skips_hidden_and_backups() {
        let dir = TempDir::new().unwrap();
        let root = tree(&dir);
        let files = collect_files(&[root.clone()]);
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "bin.dat", "sub/c.txt"]);
    }

    #[test]
    fn test_build_index_assigns_ids_in_walk_order() {
        let dir = TempDir::new().unwrap();
        let root = tree(&dir);
        let out = dir.path().join("index");

        let summary = build_index(&out, &[root.clone()], &IndexConfig::default(), false).unwrap();
        assert_eq!(summary.file_count, 3);

        let reader = IndexReader::open(&out).unwrap();
        let root_str = root.to_string_lossy().into_owned();
        assert_eq!(reader.roots().unwrap(), vec![root_str.as_str()]);
        assert!(reader.name(0).unwrap().ends_with("a.txt"));
        assert!(reader.name(1).unwrap().ends_with("b.txt"));
        assert!(reader.name(2).unwrap().ends_with("c.txt"));

        let text = bytes_to_trigram(b't', b'e', b'x');
        assert_eq!(reader.posting_list(text).unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_parallel_build_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("many");
        fs::create_dir_all(&root).unwrap();
        for i in 0..200 {
            fs::write(root.join(format!("f{:03}.txt", i)), format!("file number {}", i)).unwrap();
        }

        let first = dir.path().join("first");
        let second = dir.path().join("second");
        build_index(&first, &[root.clone()], &IndexConfig::default(), false).unwrap();
        build_index(&second, &[root], &IndexConfig::default(), false).unwrap();
        assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
    }

    #[test]
    fn test_scan_holds_at_most_one_batch() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("many");
        fs::create_dir_all(&root).unwrap();
        for i in 0..400 {
            fs::write(root.join(format!("f{:03}.txt", i)), format!("file number {}", i)).unwrap();
        }
        let files = collect_files(&[root]);
        let config = IndexConfig::default();

        let pool = rayon::ThreadPoolBuilder::new().num_threads(8).build().unwrap();
        let (peak, names) = pool.install(|| {
            assert_eq!(batch_len(), 8 * FILES_PER_THREAD);
            let mut names = Vec::new();
            let peak = scan_in_batches(&files, &config, |file| {
                assert!(file.trigrams.is_some());
                names.push(file.name);
                Ok(())
            })
            .unwrap();
            (peak, names)
        });

        assert!(peak <= 8 * FILES_PER_THREAD, "held {} scanned files", peak);
        let expected: Vec<String> = files.iter().map(|p| p.to_string_lossy().into_owned()).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_scan_stops_on_sink_error() {
        let dir = TempDir::new().unwrap();
        let root = tree(&dir);
        let files = collect_files(&[root]);
        let mut seen = 0;
        let result = scan_in_batches(&files, &IndexConfig::default(), |_| {
            seen += 1;
            Err(anyhow::anyhow!("disk full"))
        });
        assert!(result.is_err());
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_resolve_roots_sorts_and_dedups() {
        let roots = resolve_roots(&[PathBuf::from("b"), PathBuf::from("a"), PathBuf::from("b")]);
        assert_eq!(roots.len(), 2);
        assert!(roots[0].is_absolute());
        assert!(roots[0].ends_with("a"));
        assert!(roots[1].ends_with("b"));
    }

    #[test]
    fn test_build_from_reader() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("index");
        build_from_reader(&out, STDIN_NAME, &b"piped input"[..], &IndexConfig::default()).unwrap();

        let reader = IndexReader::open(&out).unwrap();
        assert_eq!(reader.file_count(), 1);
        assert_eq!(reader.name(0).unwrap(), STDIN_NAME);
        assert!(reader.roots().unwrap().is_empty());
    }
}
