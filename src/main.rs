//! `tabular-etl` command-line front end.
//!
//! One invocation is one run: extract the file, optionally clean it, ensure the database exists,
//! and replace the destination table. Status goes to stdout, the run log to `--log-file`, and
//! diagnostics (`RUST_LOG=debug`) to stderr.

mod args;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;

use tabular_etl::database::{ConnectionParams, MySqlTarget};
use tabular_etl::ingestion::{ExtractOptions, InputFile};
use tabular_etl::observability::{
    CompositeObserver, ConsoleObserver, FileObserver, LogLevel, PipelineObserver,
};
use tabular_etl::pipeline::{run, RunRequest, Step};
use tabular_etl::PipelineError;

use crate::args::Cli;

fn main() -> anyhow::Result<ExitCode> {
    // Set RUST_LOG=debug for verbose logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let log = Arc::new(
        FileObserver::new(&cli.log_file)
            .with_context(|| format!("cannot create run log at {}", cli.log_file.display()))?,
    );
    log.log(LogLevel::Info, "MySQL ETL tool started.");
    let console: Arc<dyn PipelineObserver> = Arc::new(ConsoleObserver);
    let observer = CompositeObserver::new(vec![log as Arc<dyn PipelineObserver>, console]);

    let target = MySqlTarget::new()
        .context("cannot start database runtime")?
        .with_connect_timeout(
            (cli.connect_timeout > 0).then(|| Duration::from_secs(cli.connect_timeout)),
        );

    let max_bytes = (cli.max_file_size > 0).then_some(cli.max_file_size);

    // A file that cannot be read is an extraction failure like any other.
    let input = match cli
        .file
        .as_deref()
        .map(|path| InputFile::from_path_limited(path, cli.format, max_bytes))
    {
        Some(Ok(input)) => Some(input),
        Some(Err(e)) => {
            let err = PipelineError::from(e);
            observer.on_failure(Step::Extract, &err);
            return Ok(ExitCode::FAILURE);
        }
        None => None,
    };
    if let Some(input) = &input {
        tracing::debug!(file = %input.name, format = %input.format, bytes = input.bytes.len(), "read input");
    }

    let connection = ConnectionParams::new(&cli.host, cli.user, cli.password, cli.database);
    let request = RunRequest::new(input, connection, &cli.table)
        .with_transform(cli.transform)
        .with_preview_rows(cli.preview_rows)
        .with_extract_options(ExtractOptions { max_bytes });

    let report = run(&request, &target, &observer);
    Ok(if report.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
