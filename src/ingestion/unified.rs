//! Unified extraction entrypoint.
//!
//! Most callers should use [`extract`], which dispatches an in-memory [`InputFile`] to the
//! format-specific parser once, based on its declared [`FileFormat`].
//!
//! - The declared format is trusted; a mismatch only shows up as a parser failure.
//! - Inputs larger than [`ExtractOptions::max_bytes`] are rejected before parsing.

use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::error::{ParseError, ParseResult};
use crate::types::DataSet;

use super::csv::{self, TextEncoding};
use super::json;

/// Default upper bound on the size of an input file: 256 MiB.
pub const DEFAULT_MAX_FILE_BYTES: usize = 256 * 1024 * 1024;

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Comma-separated values.
    Csv,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
    /// JSON array-of-objects or NDJSON.
    Json,
}

impl FileFormat {
    /// Parse a file format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" | "ndjson" => Some(Self::Json),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Infer the format from a path's extension.
    pub fn from_path(path: &Path) -> ParseResult<Self> {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ParseError::UnsupportedFormat {
                message: format!(
                    "cannot infer format: path has no extension ({})",
                    path.display()
                ),
            })?;

        Self::from_extension(ext).ok_or_else(|| ParseError::UnsupportedFormat {
            message: format!(
                "cannot infer format from extension '{ext}' for path ({})",
                path.display()
            ),
        })
    }
}

impl FromStr for FileFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "excel" | "xlsx" => Ok(Self::Excel),
            "json" => Ok(Self::Json),
            other => Err(ParseError::UnsupportedFormat {
                message: format!("unknown format '{other}' (expected CSV, Excel or JSON)"),
            }),
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "CSV",
            Self::Excel => "Excel",
            Self::Json => "JSON",
        })
    }
}

/// An uploaded file: its display name, raw bytes, and declared format.
#[derive(Clone)]
pub struct InputFile {
    /// Name shown in status messages (usually the file name).
    pub name: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
    /// Declared format.
    pub format: FileFormat,
}

impl fmt::Debug for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InputFile")
            .field("name", &self.name)
            .field("len", &self.bytes.len())
            .field("format", &self.format)
            .finish()
    }
}

impl InputFile {
    /// Create an input file from an in-memory blob.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>, format: FileFormat) -> Self {
        Self {
            name: name.into(),
            bytes,
            format,
        }
    }

    /// Read a file from disk. If `format` is `None`, it is inferred from the extension.
    ///
    /// This reads the whole file; use [`from_path_limited`](Self::from_path_limited) to refuse
    /// oversized files before they are buffered.
    pub fn from_path(path: impl AsRef<Path>, format: Option<FileFormat>) -> ParseResult<Self> {
        Self::from_path_limited(path, format, None)
    }

    /// Like [`from_path`](Self::from_path), but fails with [`ParseError::TooLarge`] as soon as the
    /// file is known to exceed `max_bytes`, without reading more than `max_bytes + 1` bytes.
    pub fn from_path_limited(
        path: impl AsRef<Path>,
        format: Option<FileFormat>,
        max_bytes: Option<usize>,
    ) -> ParseResult<Self> {
        let path = path.as_ref();
        let format = match format {
            Some(f) => f,
            None => FileFormat::from_path(path)?,
        };

        let file = File::open(path)?;
        let bytes = match max_bytes {
            None => {
                let mut bytes = Vec::new();
                (&file).read_to_end(&mut bytes)?;
                bytes
            }
            Some(limit) => {
                let size = file.metadata()?.len();
                if size > limit as u64 {
                    return Err(ParseError::TooLarge {
                        size: usize::try_from(size).unwrap_or(usize::MAX),
                        limit,
                    });
                }
                // The file may have grown since `metadata`.
                let mut bytes = Vec::with_capacity(size as usize);
                file.take(limit as u64 + 1).read_to_end(&mut bytes)?;
                if bytes.len() > limit {
                    return Err(ParseError::TooLarge {
                        size: bytes.len(),
                        limit,
                    });
                }
                bytes
            }
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes, format))
    }
}

/// Options controlling extraction.
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Reject inputs larger than this many bytes. `None` disables the check.
    pub max_bytes: Option<usize>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_bytes: Some(DEFAULT_MAX_FILE_BYTES),
        }
    }
}

/// Result of a successful extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted {
    /// The parsed table.
    pub data: DataSet,
    /// The text encoding used, for text formats that needed decoding (CSV).
    pub encoding: Option<TextEncoding>,
}

/// Unified extraction entry point.
///
/// # Examples
///
/// ```rust
/// use tabular_etl::ingestion::{extract, ExtractOptions, FileFormat, InputFile};
///
/// # fn main() -> Result<(), tabular_etl::ParseError> {
/// let input = InputFile::new(
///     "events.json",
///     br#"[{"id":1,"user":{"name":"Ada"}}]"#.to_vec(),
///     FileFormat::Json,
/// );
/// let out = extract(&input, &ExtractOptions::default())?;
/// assert_eq!(out.data.columns, vec!["id", "user.name"]);
/// # Ok(())
/// # }
/// ```
pub fn extract(input: &InputFile, options: &ExtractOptions) -> ParseResult<Extracted> {
    if let Some(limit) = options.max_bytes {
        if input.bytes.len() > limit {
            return Err(ParseError::TooLarge {
                size: input.bytes.len(),
                limit,
            });
        }
    }

    match input.format {
        FileFormat::Csv => {
            let (data, encoding) = csv::extract_csv_from_bytes(&input.bytes)?;
            Ok(Extracted {
                data,
                encoding: Some(encoding),
            })
        }
        FileFormat::Json => {
            let bytes = input.bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&input.bytes);
            let text = std::str::from_utf8(bytes).map_err(|e| ParseError::Malformed {
                message: format!("json is not valid utf-8: {e}"),
            })?;
            Ok(Extracted {
                data: json::extract_json_from_str(text)?,
                encoding: None,
            })
        }
        FileFormat::Excel => Ok(Extracted {
            data: extract_excel_dispatch(&input.bytes)?,
            encoding: None,
        }),
    }
}

fn extract_excel_dispatch(bytes: &[u8]) -> ParseResult<DataSet> {
    #[cfg(feature = "excel")]
    {
        super::excel::extract_excel_from_bytes(bytes)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = bytes;
        Err(ParseError::UnsupportedFormat {
            message: "excel extraction not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}

/// Make header names unique: a repeated name gets the first free `.1`, `.2`, ... suffix.
pub(crate) fn dedupe_headers(names: Vec<String>) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(names.len());
    names
        .into_iter()
        .map(|name| {
            let unique = if used.contains(&name) {
                (1..)
                    .map(|n| format!("{name}.{n}"))
                    .find(|candidate| !used.contains(candidate))
                    .unwrap_or(name)
            } else {
                name
            };
            used.insert(unique.clone());
            unique
        })
        .collect()
}
