//! # regrep - indexed regular expression search
//!
//! regrep answers a regex search without reading every file: it keeps a
//! trigram index mapping each 3-byte sequence to the files containing it,
//! compiles the regex into a boolean query over trigrams that every match
//! must satisfy, and only runs the real regex over the files the query
//! selects.
//!
//! ## Architecture
//!
//! - [`index`] - Index building (spill/merge writer, parallel scan) and the mmap reader
//! - [`query`] - Regex to trigram query compiler and executor
//! - [`grep`] - Verification pass over candidate files
//! - [`output`] - grep-style result printing
//! - [`utils`] - Trigram extraction, encodings, config and paths
//!
//! ## Quick Start
//!
//! ```no_run
//! use regrep::index::IndexReader;
//! use regrep::query::{CompilerLimits, Pattern};
//! use std::path::Path;
//!
//! let pattern = Pattern::new(r"fn\s+main", false)?;
//! let query = pattern.query(CompilerLimits::default());
//!
//! let reader = IndexReader::open(Path::new("/tmp/regrep.idx"))?;
//! for id in reader.posting_query(&query)? {
//!     println!("candidate: {}", reader.name(id)?);
//! }
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod grep;
pub mod index;
pub mod logging;
pub mod output;
pub mod query;
pub mod utils;
