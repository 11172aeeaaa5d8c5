//! Performance benchmarks for regrep
//!
//! Run with: cargo bench

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use regrep::index::IndexReader;
use regrep::index::build::build_index;
use regrep::index::types::IndexConfig;
use regrep::query::{CompilerLimits, Pattern, QueryCompiler};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

const PATTERNS: [&str; 6] = [
    "function",
    "Hello from",
    r"Struct\d+",
    r"fn\s+new\(\)",
    "(?i)println",
    "field|name|Self",
];

/// Create a test directory with sample files and index it
fn create_benchmark_fixtures() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let root_path = temp_dir.path().join("corpus");
    fs::create_dir_all(&root_path).expect("Failed to create corpus dir");

    for i in 0..200 {
        let content = format!(
            r#"// File {i}
fn function_{i}() {{
    println!("Hello from function {i}");
    let x = {i} * 2;
    let y = x + 1;
}}

struct Struct{i} {{
    field: i32,
    name: String,
}}

impl Struct{i} {{
    fn new() -> Self {{
        Self {{ field: {i}, name: "test".to_string() }}
    }}
}}
"#,
            i = i
        );
        fs::write(root_path.join(format!("file_{}.rs", i)), content)
            .expect("Failed to write file");
    }

    let index_path = temp_dir.path().join("index");
    build_index(&index_path, &[root_path], &IndexConfig::default(), false)
        .expect("Failed to build index");

    (temp_dir, index_path)
}

fn bench_trigram_extraction(c: &mut Criterion) {
    let small_content = b"fn main() { println!(\"hello\"); }";
    let medium_content = small_content.repeat(100);
    let large_content = small_content.repeat(1000);

    let mut group = c.benchmark_group("trigram_extraction");

    group.bench_function("small_32b", |b| {
        b.iter(|| regrep::utils::extract_trigrams(black_box(small_content)))
    });

    group.bench_function("medium_3kb", |b| {
        b.iter(|| regrep::utils::extract_trigrams(black_box(&medium_content)))
    });

    group.bench_function("large_32kb", |b| {
        b.iter(|| regrep::utils::extract_trigrams(black_box(&large_content)))
    });

    group.finish();
}

fn bench_query_compilation(c: &mut Criterion) {
    let compiler = QueryCompiler::new(CompilerLimits::default());

    let mut group = c.benchmark_group("query_compilation");
    for pattern in PATTERNS {
        let parsed = Pattern::new(pattern, false).expect("Failed to parse pattern");
        group.bench_with_input(BenchmarkId::from_parameter(pattern), &parsed, |b, p| {
            b.iter(|| compiler.compile(black_box(p.hir())))
        });
    }
    group.finish();
}

fn bench_posting_query(c: &mut Criterion) {
    let (_temp_dir, index_path) = create_benchmark_fixtures();
    let reader = IndexReader::open(&index_path).expect("Failed to open index");

    let mut group = c.benchmark_group("posting_query");
    for pattern in PATTERNS {
        let query = Pattern::new(pattern, false)
            .expect("Failed to parse pattern")
            .query(CompilerLimits::default());
        group.bench_with_input(BenchmarkId::from_parameter(pattern), &query, |b, q| {
            b.iter(|| reader.posting_query(black_box(q)))
        });
    }
    group.finish();
}

fn bench_index_reading(c: &mut Criterion) {
    let (_temp_dir, index_path) = create_benchmark_fixtures();

    c.bench_function("index_open", |b| {
        b.iter(|| IndexReader::open(black_box(&index_path)))
    });
}

criterion_group!(
    benches,
    bench_trigram_extraction,
    bench_query_compilation,
    bench_posting_query,
    bench_index_reading,
);

criterion_main!(benches);
