use thiserror::Error;

/// Convenience result type for extraction.
pub type ParseResult<T> = Result<T, ParseError>;

/// Error returned by extraction: the file is malformed, undecodable, or not acceptable.
///
/// This is a single error enum shared across CSV/JSON (and optional Excel) extraction.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Excel extraction error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// CSV tokenizer error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON syntax error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The input is larger than the configured limit.
    #[error("file is {size} bytes, which exceeds the {limit} byte limit")]
    TooLarge { size: usize, limit: usize },

    /// The format could not be determined, or is not supported by this build.
    #[error("unsupported format: {message}")]
    UnsupportedFormat { message: String },

    /// The input parsed, but does not have a tabular shape.
    #[error("malformed input: {message}")]
    Malformed { message: String },
}

/// Error returned while ensuring the target database exists.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// The server could not be reached or refused the credentials.
    #[error("could not connect to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: sqlx::Error,
    },

    /// Connecting took longer than the configured timeout.
    #[error("timed out connecting to {host}")]
    Timeout { host: String },

    /// The server rejected `CREATE DATABASE` (e.g. insufficient privileges).
    #[error("failed to create database '{database}': {source}")]
    Rejected {
        database: String,
        #[source]
        source: sqlx::Error,
    },

    /// The database name is empty after trimming.
    #[error("database name must not be empty")]
    EmptyName,
}

/// Error returned while writing the destination table.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The server could not be reached or refused the credentials.
    #[error("could not connect to {host}: {source}")]
    Connect {
        host: String,
        #[source]
        source: sqlx::Error,
    },

    /// Connecting took longer than the configured timeout.
    #[error("timed out connecting to {host}")]
    Timeout { host: String },

    /// A statement failed (privileges, type coercion, constraint, ...).
    #[error("{stage} failed for table '{table}': {source}")]
    Statement {
        stage: &'static str,
        table: String,
        #[source]
        source: sqlx::Error,
    },

    /// A table needs at least one column.
    #[error("nothing to load: the data set has no columns")]
    NoColumns,

    /// The table name is empty after normalization.
    #[error("table name must not be empty")]
    EmptyTableName,
}

/// Any error that terminates a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("file extraction failed: {0}")]
    Parse(#[from] ParseError),

    #[error("failed to create database: {0}")]
    Provisioning(#[from] ProvisioningError),

    #[error("failed to load into MySQL: {0}")]
    Load(#[from] LoadError),
}
