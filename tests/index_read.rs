//! Index round-trip tests: build with the writer, read back with the reader.

use regrep::index::posting::is_strictly_ascending;
use regrep::index::{IndexConfig, IndexReader, IndexWriter, Trigram, bytes_to_trigram};
use std::path::PathBuf;
use tempfile::TempDir;

fn tri(s: &str) -> Trigram {
    let b = s.as_bytes();
    bytes_to_trigram(b[0], b[1], b[2])
}

const POST_FILES: [(&str, &str); 4] = [
    ("file0", ""),
    ("file1", "Tester Code Search"),
    ("file2", "Tester Code Project Hosting"),
    ("file3", "Tester Web Search"),
];

fn build(dir: &TempDir, docs: &[(&str, &str)], config: IndexConfig) -> PathBuf {
    let out = dir.path().join("index");
    let mut writer = IndexWriter::create(&out, config);
    for (name, content) in docs {
        writer.add(name, content.as_bytes()).unwrap();
    }
    writer.flush().unwrap();
    out
}

#[test]
fn test_posting_list_worked_example() {
    let dir = TempDir::new().unwrap();
    let reader = IndexReader::open(&build(&dir, &POST_FILES, IndexConfig::default())).unwrap();

    assert_eq!(reader.file_count(), 4);
    assert_eq!(reader.posting_list(tri("Sea")).unwrap(), vec![1, 3]);
    assert_eq!(reader.posting_list(tri("Tes")).unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_posting_and_or_worked_example() {
    let dir = TempDir::new().unwrap();
    let reader = IndexReader::open(&build(&dir, &POST_FILES, IndexConfig::default())).unwrap();

    let sea = reader.posting_list(tri("Sea")).unwrap();
    let tes = reader.posting_list(tri("Tes")).unwrap();

    assert_eq!(reader.posting_and(&sea, tri("Tes")).unwrap(), vec![1, 3]);
    assert_eq!(reader.posting_and(&tes, tri("Sea")).unwrap(), vec![1, 3]);
    assert_eq!(reader.posting_or(&sea, tri("Tes")).unwrap(), vec![1, 2, 3]);
    assert_eq!(reader.posting_or(&tes, tri("Sea")).unwrap(), vec![1, 2, 3]);
}

#[test]
fn test_posting_algebra_is_commutative() {
    let dir = TempDir::new().unwrap();
    let reader = IndexReader::open(&build(&dir, &POST_FILES, IndexConfig::default())).unwrap();

    let probes = ["Tes", "Sea", "Cod", "Web", "Hos", "ter", "zzz"];
    for a in probes {
        for b in probes {
            let la = reader.posting_list(tri(a)).unwrap();
            let lb = reader.posting_list(tri(b)).unwrap();

            let and_ab = reader.posting_and(&la, tri(b)).unwrap();
            let and_ba = reader.posting_and(&lb, tri(a)).unwrap();
            assert_eq!(and_ab, and_ba, "{} AND {}", a, b);
            assert!(and_ab.iter().all(|id| la.contains(id) && lb.contains(id)));

            let or_ab = reader.posting_or(&la, tri(b)).unwrap();
            let or_ba = reader.posting_or(&lb, tri(a)).unwrap();
            assert_eq!(or_ab, or_ba, "{} OR {}", a, b);
            assert!(or_ab.len() <= la.len() + lb.len());

            assert!(is_strictly_ascending(&and_ab));
            assert!(is_strictly_ascending(&or_ab));
        }
    }
}

#[test]
fn test_names_round_trip_in_order() {
    let dir = TempDir::new().unwrap();
    let docs: Vec<(String, String)> = (0..300)
        .map(|i| (format!("/corpus/dir{}/file{}.txt", i % 7, i), format!("content {}", i)))
        .collect();
    let refs: Vec<(&str, &str)> = docs.iter().map(|(n, c)| (n.as_str(), c.as_str())).collect();

    let reader = IndexReader::open(&build(&dir, &refs, IndexConfig::default())).unwrap();
    assert_eq!(reader.file_count(), 300);
    for (id, (name, _)) in docs.iter().enumerate() {
        assert_eq!(reader.name(id as u32).unwrap(), name);
    }
    assert!(reader.name(300).is_err());
}

#[test]
fn test_spilled_build_reads_back_the_same() {
    let docs: Vec<(String, String)> = (0..50)
        .map(|i| (format!("f{}", i), format!("shared words and token{}", i % 5)))
        .collect();
    let refs: Vec<(&str, &str)> = docs.iter().map(|(n, c)| (n.as_str(), c.as_str())).collect();

    let dir = TempDir::new().unwrap();
    let spilled = IndexConfig {
        spill_threshold: 16,
        ..IndexConfig::default()
    };
    let reader = IndexReader::open(&build(&dir, &refs, spilled)).unwrap();

    let all: Vec<u32> = (0..50).collect();
    assert_eq!(reader.posting_list(tri("sha")).unwrap(), all);
    assert_eq!(
        reader.posting_list(tri("en3")).unwrap(),
        vec![3, 8, 13, 18, 23, 28, 33, 38, 43, 48]
    );
}

#[test]
fn test_every_posting_id_is_in_range() {
    let dir = TempDir::new().unwrap();
    let reader = IndexReader::open(&build(&dir, &POST_FILES, IndexConfig::default())).unwrap();

    for content in POST_FILES.iter().map(|(_, c)| c) {
        for window in content.as_bytes().windows(3) {
            let list = reader
                .posting_list(bytes_to_trigram(window[0], window[1], window[2]))
                .unwrap();
            assert!(!list.is_empty());
            assert!(list.iter().all(|&id| id < reader.file_count()));
        }
    }
}
