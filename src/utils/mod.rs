//! Shared utilities.
//!
//! - [`app_data`] - Config file and index file locations
//! - [`encoding`] - Varints, gap encoding and fixed-width integers
//! - [`progress`] - Progress bars (no-ops without the `progress` feature)
//! - [`trigram`] - Trigram extraction and the searchable view of a file

pub mod app_data;
pub mod encoding;
pub mod progress;
pub mod trigram;

pub use app_data::*;
pub use encoding::*;
pub use trigram::*;
