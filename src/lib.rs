//! `tabular-etl` extracts a tabular file into an in-memory [`types::DataSet`], optionally cleans
//! it, and loads it into a MySQL table, creating the database first if it does not exist.
//!
//! The primary entrypoint is [`pipeline::run`], which executes one run end to end and reports
//! each step to a [`observability::PipelineObserver`].
//!
//! ## What you can extract
//!
//! **File formats (declared by the caller, or inferred from the extension):**
//!
//! - **CSV**: `.csv`, decoded as UTF-8 with a Latin-1 fallback
//! - **JSON**: `.json` (array-of-objects, a single object, or NDJSON); nested objects are
//!   flattened into dot-path columns such as `user.name`
//! - **Excel** (Cargo feature `excel`, on by default): the first sheet of `.xlsx` and friends
//!
//! Cells are untyped [`types::Value`]s inferred from the source. Empty cells map to
//! [`types::Value::Null`]; column types are inferred again at load time.
//!
//! ## Cleaning
//!
//! When enabled, [`processing::clean`] drops all-empty rows, fills remaining empty cells with
//! `""`, normalizes column names (`"Col 1"` → `"col_1"`), and drops duplicate rows, in that order.
//!
//! ## Loading
//!
//! [`database::MySqlTarget`] creates the database if needed and then replaces the destination
//! table atomically: rows are written to a staging table and swapped in with `RENAME TABLE`.
//!
//! ## Example
//!
//! ```no_run
//! use tabular_etl::database::{ConnectionParams, MySqlTarget};
//! use tabular_etl::ingestion::InputFile;
//! use tabular_etl::observability::ConsoleObserver;
//! use tabular_etl::pipeline::{run, RunRequest};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let input = InputFile::from_path("people.csv", None)?;
//! let params = ConnectionParams::new("localhost", "etl", "s3cret", "warehouse");
//! let request = RunRequest::new(Some(input), params, "People").with_transform(true);
//!
//! let report = run(&request, &MySqlTarget::new()?, &ConsoleObserver);
//! assert!(report.succeeded(), "{:?}", report.error);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: format dispatch and format-specific extraction
//! - [`types`]: the in-memory data set
//! - [`processing`]: the cleaning pipeline
//! - [`database`]: provisioning and load
//! - [`pipeline`]: the single-run state machine
//! - [`observability`]: run log and status reporting
//! - [`error`]: error types

pub mod database;
pub mod error;
pub mod ingestion;
pub mod observability;
pub mod pipeline;
pub mod processing;
pub mod types;

pub use error::{LoadError, ParseError, ParseResult, PipelineError, ProvisioningError};
