//! In-memory data transformations.
//!
//! The processing layer operates on [`crate::types::DataSet`] values produced by extraction.
//! Its only job is the optional cleaning pipeline in [`clean`](mod@clean).
//!
//! ## Example
//!
//! ```rust
//! use tabular_etl::processing::clean;
//! use tabular_etl::types::{DataSet, Value};
//!
//! let ds = DataSet::new(
//!     vec!["Col 1".to_string(), "Col 2".to_string()],
//!     vec![
//!         vec![Value::Utf8("a".to_string()), Value::Null],
//!         vec![Value::Null, Value::Null],
//!         vec![Value::Utf8("a".to_string()), Value::Null],
//!     ],
//! )
//! .unwrap();
//!
//! let cleaned = clean(&ds);
//! assert_eq!(cleaned.columns, vec!["col_1", "col_2"]);
//! assert_eq!(cleaned.row_count(), 1);
//! ```

pub mod clean;

pub use clean::{clean, drop_duplicate_rows, drop_empty_rows, fill_empty, normalize_columns};
