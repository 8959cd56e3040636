//! CSV extraction.
//!
//! Bytes are decoded as UTF-8 first and as Latin-1 (ISO-8859-1) if that fails. The first record
//! is the header; cell types are inferred per column from the raw text.

use std::borrow::Cow;

use crate::error::{ParseError, ParseResult};
use crate::types::{DataSet, DataType, Value};

use super::unified::dedupe_headers;

/// Text encoding actually used to decode a CSV blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Latin1,
}

/// Raw cell strings that are read as missing values.
pub const NA_TOKENS: &[&str] = &[
    "", "NA", "N/A", "n/a", "NaN", "nan", "-NaN", "null", "NULL", "None", "#N/A", "<NA>",
];

/// Extract a CSV blob into a [`DataSet`], reporting which encoding decoded it.
pub fn extract_csv_from_bytes(bytes: &[u8]) -> ParseResult<(DataSet, TextEncoding)> {
    let (text, encoding) = decode_text(bytes);
    let ds = extract_csv_from_str(&text)?;
    Ok((ds, encoding))
}

/// Decode `bytes` as UTF-8, falling back to Latin-1. A leading UTF-8 BOM is dropped.
pub fn decode_text(bytes: &[u8]) -> (Cow<'_, str>, TextEncoding) {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => (Cow::Borrowed(s), TextEncoding::Utf8),
        // Every byte is a valid Latin-1 code point, so this step cannot fail.
        Err(_) => (
            Cow::Owned(bytes.iter().map(|&b| char::from(b)).collect()),
            TextEncoding::Latin1,
        ),
    }
}

/// Extract CSV text into a [`DataSet`].
pub fn extract_csv_from_str(text: &str) -> ParseResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());
    extract_csv_from_reader(&mut rdr)
}

/// Extract CSV data from an existing CSV reader (which must be configured with headers).
///
/// Rules:
///
/// - Empty header cells are named `Unnamed: <index>`; repeated names get `.1`, `.2`, ... suffixes.
/// - Short rows are padded with nulls; rows longer than the header are rejected.
/// - Cells matching [`NA_TOKENS`] become [`Value::Null`].
pub fn extract_csv_from_reader<R: std::io::Read>(rdr: &mut csv::Reader<R>) -> ParseResult<DataSet> {
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(ParseError::Malformed {
            message: "no columns to parse from file".to_string(),
        });
    }
    let columns = dedupe_headers(
        headers
            .iter()
            .enumerate()
            .map(|(idx, h)| {
                if h.trim().is_empty() {
                    format!("Unnamed: {idx}")
                } else {
                    h.to_string()
                }
            })
            .collect(),
    );

    let width = columns.len();
    let mut raw_rows: Vec<Vec<Option<String>>> = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(ParseError::Malformed {
                message: format!("expected {width} fields in line {line}, saw {}", record.len()),
            });
        }

        let mut row: Vec<Option<String>> = record
            .iter()
            .map(|raw| (!NA_TOKENS.contains(&raw)).then(|| raw.to_string()))
            .collect();
        row.resize(width, None);
        raw_rows.push(row);
    }

    let types: Vec<DataType> = (0..width)
        .map(|idx| infer_text_column(raw_rows.iter().filter_map(|row| row[idx].as_deref())))
        .collect();

    let rows = raw_rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&types)
                .map(|(raw, data_type)| match raw {
                    None => Value::Null,
                    Some(raw) => parse_typed_value(*data_type, raw),
                })
                .collect()
        })
        .collect();

    DataSet::new(columns, rows)
}

fn infer_text_column<'a>(cells: impl Iterator<Item = &'a str> + Clone) -> DataType {
    if cells.clone().all(|c| c.trim().parse::<i64>().is_ok()) {
        DataType::Int64
    } else if cells.clone().all(|c| parse_finite_f64(c).is_some()) {
        DataType::Float64
    } else if cells.clone().all(|c| parse_bool(c).is_some()) {
        DataType::Bool
    } else {
        DataType::Utf8
    }
}

// Only called with a type that `infer_text_column` accepted for every cell in the column.
fn parse_typed_value(data_type: DataType, raw: String) -> Value {
    match data_type {
        DataType::Int64 => raw.trim().parse().map(Value::Int64).unwrap_or(Value::Utf8(raw)),
        DataType::Float64 => parse_finite_f64(&raw).map(Value::Float64).unwrap_or(Value::Utf8(raw)),
        DataType::Bool => parse_bool(&raw).map(Value::Bool).unwrap_or(Value::Utf8(raw)),
        DataType::Utf8 => Value::Utf8(raw),
    }
}

fn parse_finite_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_text_prefers_utf8_and_strips_bom() {
        let (text, enc) = decode_text("\u{feff}a,b\n".as_bytes());
        assert_eq!(enc, TextEncoding::Utf8);
        assert_eq!(text, "a,b\n");
    }

    #[test]
    fn decode_text_falls_back_to_latin1() {
        // "café" with é as a single Latin-1 byte (0xE9) is not valid UTF-8.
        let (text, enc) = decode_text(b"caf\xE9");
        assert_eq!(enc, TextEncoding::Latin1);
        assert_eq!(text, "café");
    }

    #[test]
    fn infers_int_float_bool_and_text_columns() {
        let ds = extract_csv_from_str("i,f,b,s\n1,1.5,true,x\n2,2,False,3\n").unwrap();
        assert_eq!(ds.rows[0], vec![
            Value::Int64(1),
            Value::Float64(1.5),
            Value::Bool(true),
            Value::Utf8("x".to_string()),
        ]);
        assert_eq!(ds.rows[1][1], Value::Float64(2.0));
        assert_eq!(ds.rows[1][2], Value::Bool(false));
        assert_eq!(ds.rows[1][3], Value::Utf8("3".to_string()));
    }

    #[test]
    fn na_tokens_become_null_and_do_not_affect_inference() {
        let ds = extract_csv_from_str("n\n1\nNA\n\n3\nnull\n").unwrap();
        let values: Vec<Value> = ds.rows.iter().map(|r| r[0].clone()).collect();
        assert_eq!(values, vec![Value::Int64(1), Value::Null, Value::Int64(3), Value::Null]);
    }

    #[test]
    fn non_finite_floats_stay_text() {
        let ds = extract_csv_from_str("x\ninf\n1.0\n").unwrap();
        assert_eq!(ds.rows[0][0], Value::Utf8("inf".to_string()));
    }

    #[test]
    fn names_unnamed_and_duplicate_headers() {
        let ds = extract_csv_from_str(",a,a,a.1\n1,2,3,4\n").unwrap();
        assert_eq!(ds.columns, vec!["Unnamed: 0", "a", "a.1", "a.1.1"]);
    }

    #[test]
    fn pads_short_rows_and_rejects_long_rows() {
        let ds = extract_csv_from_str("a,b,c\n1\n").unwrap();
        assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::Null, Value::Null]);

        let err = extract_csv_from_str("a,b\n1,2\n1,2,3\n").unwrap_err();
        assert!(err.to_string().contains("expected 2 fields in line 3, saw 3"), "{err}");
    }

    #[test]
    fn empty_input_is_malformed() {
        let err = extract_csv_from_str("").unwrap_err();
        assert!(matches!(err, ParseError::Malformed { .. }));
    }

    #[test]
    fn header_only_file_has_no_rows() {
        let ds = extract_csv_from_str("a,b\n").unwrap();
        assert_eq!(ds.columns, vec!["a", "b"]);
        assert_eq!(ds.row_count(), 0);
    }
}
