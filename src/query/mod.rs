//! Regex to trigram query compilation and evaluation.
//!
//! - [`Pattern`] parses a regex for both matching and analysis
//! - [`QueryCompiler`] turns the syntax tree into a [`Query`]
//! - [`QueryExecutor`] evaluates a query against an index

pub mod compiler;
pub mod executor;
pub mod pattern;
pub mod types;

pub use compiler::{CompilerLimits, QueryCompiler};
pub use executor::QueryExecutor;
pub use pattern::Pattern;
pub use types::Query;
