#![cfg(feature = "excel")]

use std::io::Cursor;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::{ParseError, ParseResult};
use crate::types::{DataSet, Value};

use super::unified::dedupe_headers;

/// Extract the first sheet of an Excel document (`.xlsx`, `.xls`, `.ods`, etc.) held in memory.
///
/// Behavior:
/// - Detects the first non-empty row as the header row
/// - Reads remaining rows and converts cells into [`Value`]s (integral floats become integers)
/// - Pads rows to the header width
pub fn extract_excel_from_bytes(bytes: &[u8]) -> ParseResult<DataSet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ParseError::Malformed {
            message: "workbook has no sheets".to_string(),
        })??;
    extract_sheet_range(&range)
}

fn extract_sheet_range(range: &calamine::Range<Data>) -> ParseResult<DataSet> {
    let header_row_idx = range
        .rows()
        .position(|row| row.iter().any(|c| !matches!(c, Data::Empty)))
        .ok_or_else(|| ParseError::Malformed {
            message: "sheet has no non-empty rows (no header row found)".to_string(),
        })?;

    let mut rows_iter = range.rows().skip(header_row_idx);
    let header_cells: Vec<String> = rows_iter
        .next()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(idx, c)| match cell_to_header_string(c) {
                    s if s.trim().is_empty() => format!("Unnamed: {idx}"),
                    s => s,
                })
                .collect()
        })
        .unwrap_or_default();
    let columns = dedupe_headers(header_cells);
    let width = columns.len();

    let rows = rows_iter
        .map(|row| {
            let mut out: Vec<Value> = row.iter().take(width).map(convert_cell).collect();
            out.resize(width, Value::Null);
            out
        })
        .collect();

    DataSet::new(columns, rows)
}

fn cell_to_header_string(c: &Data) -> String {
    match convert_cell(c) {
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Value::Int64(*f as i64)
            } else {
                Value::Float64(*f)
            }
        }
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(dt) => {
            let text = if dt.is_duration() {
                None
            } else {
                dt.as_datetime().map(|ts| {
                    if ts.time() == chrono::NaiveTime::MIN {
                        ts.format("%Y-%m-%d").to_string()
                    } else {
                        ts.format("%Y-%m-%dT%H:%M:%S").to_string()
                    }
                })
            };
            Value::Utf8(text.unwrap_or_else(|| dt.as_f64().to_string()))
        }
        Data::DateTimeIso(s) => Value::Utf8(s.clone()),
        Data::DurationIso(s) => Value::Utf8(s.clone()),
        Data::Error(e) => Value::Utf8(e.to_string()),
    }
}
