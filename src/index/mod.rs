pub mod build;
pub mod format;
pub mod posting;
pub mod reader;
pub mod spill;
pub mod types;
pub mod writer;

pub use reader::IndexReader;
pub use types::*;
pub use writer::{IndexSummary, IndexWriter};
