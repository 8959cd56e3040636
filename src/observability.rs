//! Run log and user-facing status reporting.
//!
//! The pipeline reports every step outcome to a [`PipelineObserver`]. The crate ships three:
//!
//! - [`FileObserver`]: the append-only run log (`<timestamp> - <LEVEL> - <message>`)
//! - [`ConsoleObserver`]: status lines and previews on stdout
//! - [`CompositeObserver`]: fans out to several observers

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::PipelineError;
use crate::pipeline::Step;
use crate::types::DataSet;

/// Default location of the run log.
pub const DEFAULT_LOG_PATH: &str = "logs/etl_log.txt";

/// Severity of a run-log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
        })
    }
}

/// Observer interface for pipeline outcomes.
///
/// Every attempted step produces exactly one `on_success` or `on_failure` call.
pub trait PipelineObserver: Send + Sync {
    /// Called when a step succeeds.
    fn on_success(&self, _step: Step, _message: &str) {}

    /// Called when a step fails; the run stops afterwards.
    fn on_failure(&self, _step: Step, _error: &PipelineError) {}

    /// Called for non-fatal problems (e.g. no input file).
    fn on_warning(&self, _message: &str) {}

    /// Progress notes that are shown to the user but not logged.
    fn on_info(&self, _message: &str) {}

    /// Called with the first rows of the data after extraction and after transformation.
    fn on_preview(&self, _step: Step, _preview: &DataSet) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn PipelineObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn PipelineObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl PipelineObserver for CompositeObserver {
    fn on_success(&self, step: Step, message: &str) {
        for o in &self.observers {
            o.on_success(step, message);
        }
    }

    fn on_failure(&self, step: Step, error: &PipelineError) {
        for o in &self.observers {
            o.on_failure(step, error);
        }
    }

    fn on_warning(&self, message: &str) {
        for o in &self.observers {
            o.on_warning(message);
        }
    }

    fn on_info(&self, message: &str) {
        for o in &self.observers {
            o.on_info(message);
        }
    }

    fn on_preview(&self, step: Step, preview: &DataSet) {
        for o in &self.observers {
            o.on_preview(step, preview);
        }
    }
}

/// Prints status messages and previews to stdout.
#[derive(Debug, Default)]
pub struct ConsoleObserver;

impl PipelineObserver for ConsoleObserver {
    fn on_success(&self, step: Step, message: &str) {
        println!("[{step}][ok] {message}");
    }

    fn on_failure(&self, step: Step, error: &PipelineError) {
        println!("[{step}][error] {error}");
    }

    fn on_warning(&self, message: &str) {
        println!("[warning] {message}");
    }

    fn on_info(&self, message: &str) {
        println!("[info] {message}");
    }

    fn on_preview(&self, step: Step, preview: &DataSet) {
        println!("[{step}] preview ({} rows):\n{preview}", preview.row_count());
    }
}

/// Appends run events to a local log file, one `<timestamp> - <LEVEL> - <message>` line each.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends to `path`, creating its parent directory if needed.
    ///
    /// Later writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    /// Path of the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line at `level`.
    pub fn log(&self, level: LogLevel, message: &str) {
        // One write per line so concurrent appenders never interleave mid-line.
        let line = format!("{} - {level} - {message}\n", timestamp());
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = f.write_all(line.as_bytes());
        }
    }
}

impl PipelineObserver for FileObserver {
    fn on_success(&self, _step: Step, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn on_failure(&self, _step: Step, error: &PipelineError) {
        self.log(LogLevel::Error, &error.to_string());
    }

    fn on_warning(&self, message: &str) {
        self.log(LogLevel::Warning, message);
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S,%3f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;

    #[test]
    fn file_observer_creates_directory_and_appends_formatted_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("etl_log.txt");
        let obs = FileObserver::new(&path).unwrap();
        assert!(path.parent().unwrap().is_dir());

        obs.on_success(Step::Extract, "Extracted file successfully. Rows: 3");
        obs.on_info("not logged");
        obs.on_warning("No file uploaded.");
        obs.on_failure(Step::Load, &PipelineError::Load(LoadError::NoColumns));

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with(" - INFO - Extracted file successfully. Rows: 3"));
        assert!(lines[1].ends_with(" - WARNING - No file uploaded."));
        assert!(lines[2].contains(" - ERROR - failed to load into MySQL: nothing to load"));

        // `2026-10-17 09:15:02,123 - ...`
        let ts = lines[0].split(" - ").next().unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S,%3f").is_ok(), "{ts}");
    }

    #[test]
    fn file_observer_appends_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.log");
        FileObserver::new(&path).unwrap().log(LogLevel::Info, "first");
        FileObserver::new(&path).unwrap().log(LogLevel::Info, "second");
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }
}
