//! A single extract → (clean) → provision → load run.
//!
//! [`run`] walks the states `Idle → FileSelected → Extracted → [Transformed] →
//! DatabaseProvisioned → Loaded`. The first failing step moves the run to
//! [`RunState::Failed`] and nothing after it executes. Errors are reported to the observer and
//! returned inside the [`RunReport`]; `run` itself never fails.

use std::fmt;

use crate::database::{normalize_table_name, ConnectionParams, LoadTarget};
use crate::error::PipelineError;
use crate::ingestion::{extract, ExtractOptions, FileFormat, InputFile, TextEncoding};
use crate::observability::PipelineObserver;
use crate::processing::clean;

/// Rows shown in each preview when nothing else is configured.
pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// A pipeline step that reports one success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Extract,
    Transform,
    Provision,
    Load,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Step::Extract => "extract",
            Step::Transform => "transform",
            Step::Provision => "provision",
            Step::Load => "load",
        })
    }
}

/// Where a run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    FileSelected,
    Extracted,
    Transformed,
    DatabaseProvisioned,
    /// Terminal success.
    Loaded,
    /// Terminal error, at the given step.
    Failed(Step),
}

/// Everything one run needs.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// The uploaded file; `None` ends the run with a warning.
    pub input: Option<InputFile>,
    pub connection: ConnectionParams,
    /// Destination table; always stored normalized.
    pub table: String,
    /// Apply the cleaning pipeline before loading.
    pub transform: bool,
    pub extract: ExtractOptions,
    /// Rows shown in each preview.
    pub preview_rows: usize,
}

impl RunRequest {
    /// Build a request, normalizing the table name.
    pub fn new(input: Option<InputFile>, connection: ConnectionParams, table: &str) -> Self {
        Self {
            input,
            connection,
            table: normalize_table_name(table),
            transform: false,
            extract: ExtractOptions::default(),
            preview_rows: DEFAULT_PREVIEW_ROWS,
        }
    }

    /// Enable or disable the cleaning pipeline.
    pub fn with_transform(mut self, transform: bool) -> Self {
        self.transform = transform;
        self
    }

    /// Override extraction options.
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract = options;
        self
    }

    /// Override the preview size.
    pub fn with_preview_rows(mut self, rows: usize) -> Self {
        self.preview_rows = rows;
        self
    }
}

/// Outcome of a run.
#[derive(Debug)]
pub struct RunReport {
    pub state: RunState,
    /// Rows produced by extraction, if it succeeded.
    pub rows_extracted: Option<usize>,
    /// Rows written to the table, if the load succeeded.
    pub rows_loaded: Option<usize>,
    /// The error that ended the run, if any.
    pub error: Option<PipelineError>,
}

impl RunReport {
    fn new() -> Self {
        Self {
            state: RunState::Idle,
            rows_extracted: None,
            rows_loaded: None,
            error: None,
        }
    }

    /// `true` once the data is in the destination table.
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Loaded
    }

    fn fail(mut self, step: Step, error: PipelineError, observer: &dyn PipelineObserver) -> Self {
        tracing::debug!(%step, error = %error, "run failed");
        observer.on_failure(step, &error);
        self.state = RunState::Failed(step);
        self.error = Some(error);
        self
    }
}

/// Execute one pipeline run against `target`, reporting progress to `observer`.
pub fn run(request: &RunRequest, target: &dyn LoadTarget, observer: &dyn PipelineObserver) -> RunReport {
    let mut report = RunReport::new();

    let Some(input) = request.input.as_ref() else {
        observer.on_warning("No file uploaded.");
        return report;
    };
    report.state = RunState::FileSelected;
    tracing::debug!(file = %input.name, format = %input.format, "run started");

    // Extract
    if input.format == FileFormat::Json {
        observer.on_info("Flattening nested JSON...");
    }
    let extracted = match extract(input, &request.extract) {
        Ok(e) => e,
        Err(e) => return report.fail(Step::Extract, e.into(), observer),
    };
    if extracted.encoding == Some(TextEncoding::Latin1) {
        observer.on_info("File is not valid UTF-8; decoded as Latin-1.");
    }
    let mut data = extracted.data;
    report.rows_extracted = Some(data.row_count());
    report.state = RunState::Extracted;
    observer.on_success(
        Step::Extract,
        &format!(
            "Extracted {} file '{}' successfully. Rows: {}",
            input.format,
            input.name,
            data.row_count()
        ),
    );
    observer.on_preview(Step::Extract, &data.head(request.preview_rows));

    // Transform
    if request.transform {
        observer.on_info("Applying transformations...");
        let before = data.row_count();
        data = clean(&data);
        report.state = RunState::Transformed;
        observer.on_success(
            Step::Transform,
            &format!(
                "Transformations applied successfully. Rows: {} -> {}",
                before,
                data.row_count()
            ),
        );
        observer.on_preview(Step::Transform, &data.head(request.preview_rows));
    }

    // Provision
    let params = &request.connection;
    if let Err(e) = target.ensure_database(params) {
        return report.fail(Step::Provision, e.into(), observer);
    }
    report.state = RunState::DatabaseProvisioned;
    observer.on_success(
        Step::Provision,
        &format!("Database '{}' verified/created successfully.", params.database),
    );

    // Load
    match target.replace_table(params, &request.table, &data) {
        Ok(stats) => {
            report.rows_loaded = Some(stats.rows);
            report.state = RunState::Loaded;
            let verb = if stats.replaced_existing { "replaced" } else { "created" };
            observer.on_success(
                Step::Load,
                &format!(
                    "Loaded {} rows into MySQL table {}.{} ({verb}).",
                    stats.rows, params.database, request.table
                ),
            );
            report
        }
        Err(e) => report.fail(Step::Load, e.into(), observer),
    }
}
