//! Extraction entrypoints and implementations.
//!
//! Most callers should use [`extract`] (from [`unified`]) which:
//!
//! - dispatches on the declared [`FileFormat`] of an in-memory [`InputFile`]
//! - enforces the configured size limit
//! - returns an untyped [`crate::types::DataSet`]
//!
//! Format-specific functions are also available under:
//! - [`csv`]
//! - [`json`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod json;
pub mod unified;

pub use self::csv::TextEncoding;
pub use unified::{extract, ExtractOptions, Extracted, FileFormat, InputFile, DEFAULT_MAX_FILE_BYTES};
