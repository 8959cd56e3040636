//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;

use tabular_etl::database::{DEFAULT_HOST, DEFAULT_TABLE};
use tabular_etl::ingestion::{FileFormat, DEFAULT_MAX_FILE_BYTES};
use tabular_etl::observability::DEFAULT_LOG_PATH;
use tabular_etl::pipeline::DEFAULT_PREVIEW_ROWS;

#[derive(Parser)]
#[command(name = "tabular-etl")]
#[command(about = "Extract a CSV, Excel or JSON file and load it into a MySQL table")]
#[command(version)]
pub struct Cli {
    /// File to load (.csv, .xlsx or .json)
    pub file: Option<PathBuf>,

    /// Declared file format: CSV, Excel or JSON (default: inferred from the extension)
    #[arg(long, value_parser = parse_format)]
    pub format: Option<FileFormat>,

    /// MySQL database name (created if missing)
    #[arg(long, env = "ETL_DATABASE")]
    pub database: String,

    /// MySQL user name
    #[arg(long, short, env = "ETL_USER")]
    pub user: String,

    /// MySQL password
    #[arg(long, env = "ETL_PASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,

    /// MySQL host, optionally with a port (`host:3307`)
    #[arg(long, env = "ETL_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Destination table (trimmed, lowercased, spaces become underscores)
    #[arg(long, env = "ETL_TABLE", default_value = DEFAULT_TABLE)]
    pub table: String,

    /// Apply the cleaning pipeline before loading
    #[arg(long, short)]
    pub transform: bool,

    /// Append-only run log
    #[arg(long, default_value = DEFAULT_LOG_PATH)]
    pub log_file: PathBuf,

    /// Rows shown in each preview
    #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
    pub preview_rows: usize,

    /// Reject files larger than this many bytes (0 disables the limit)
    #[arg(long, default_value_t = DEFAULT_MAX_FILE_BYTES)]
    pub max_file_size: usize,

    /// Seconds to wait for a database connection (0 waits indefinitely)
    #[arg(long, default_value_t = 30)]
    pub connect_timeout: u64,
}

fn parse_format(s: &str) -> Result<FileFormat, String> {
    s.parse().map_err(|e: tabular_etl::ParseError| e.to_string())
}
