//! JSON extraction with nested-object flattening.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single object, read as one row
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Nested objects are flattened into dot-path columns: `{"user":{"name":"Ada"}}` becomes a
//! `user.name` column. Columns appear in first-seen order across all rows; keys missing from a
//! row become nulls.

use std::collections::HashMap;

use serde_json::Map;

use crate::error::{ParseError, ParseResult};
use crate::types::{DataSet, Value};

/// Extract JSON text into a flattened [`DataSet`].
pub fn extract_json_from_str(input: &str) -> ParseResult<DataSet> {
    let records = parse_records(input)?;

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut sparse_rows: Vec<Vec<(usize, Value)>> = Vec::with_capacity(records.len());

    for (idx0, record) in records.iter().enumerate() {
        let obj = record.as_object().ok_or_else(|| ParseError::Malformed {
            message: format!("row {} is not a json object", idx0 + 1),
        })?;

        let mut flat = Vec::new();
        flatten_object(None, obj, &mut flat);

        let cells = flat
            .into_iter()
            .map(|(path, value)| {
                let pos = *positions.entry(path.clone()).or_insert_with(|| {
                    columns.push(path);
                    columns.len() - 1
                });
                (pos, value)
            })
            .collect();
        sparse_rows.push(cells);
    }

    let width = columns.len();
    let rows = sparse_rows
        .into_iter()
        .map(|cells| {
            let mut row = vec![Value::Null; width];
            for (pos, value) in cells {
                row[pos] = value;
            }
            row
        })
        .collect();

    DataSet::new(columns, rows)
}

fn parse_records(input: &str) -> ParseResult<Vec<serde_json::Value>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Malformed {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Array(items)) => Ok(items),
        Ok(v @ serde_json::Value::Object(_)) => Ok(vec![v]),
        Ok(_) => Err(ParseError::Malformed {
            message: "json must be an array of objects, an object, or NDJSON".to_string(),
        }),
        // A broken array or a single-line document is not NDJSON; report the original error.
        Err(e) if trimmed.starts_with('[') || !trimmed.contains('\n') => Err(e.into()),
        Err(_) => {
            let mut values = Vec::new();
            for (i, line) in trimmed.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let v = serde_json::from_str::<serde_json::Value>(line).map_err(|e| {
                    ParseError::Malformed {
                        message: format!("invalid ndjson at line {}: {}", i + 1, e),
                    }
                })?;
                values.push(v);
            }
            Ok(values)
        }
    }
}

fn flatten_object(
    prefix: Option<&str>,
    obj: &Map<String, serde_json::Value>,
    out: &mut Vec<(String, Value)>,
) {
    for (key, v) in obj {
        let path = match prefix {
            Some(p) => format!("{p}.{key}"),
            None => key.clone(),
        };
        match v {
            serde_json::Value::Object(inner) if !inner.is_empty() => {
                flatten_object(Some(&path), inner, out)
            }
            other => out.push((path, convert_json_value(other))),
        }
    }
}

fn convert_json_value(v: &serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int64(i),
            None => n.as_f64().map(Value::Float64).unwrap_or(Value::Utf8(n.to_string())),
        },
        serde_json::Value::String(s) => Value::Utf8(s.clone()),
        // Arrays (and empty objects) are kept as their compact JSON text.
        other => Value::Utf8(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_nested_objects_into_dot_paths() {
        let ds = extract_json_from_str(r#"[{"a":{"b":1,"c":{"d":"x"}},"e":true}]"#).unwrap();
        assert_eq!(ds.columns, vec!["a.b", "a.c.d", "e"]);
        assert_eq!(
            ds.rows[0],
            vec![Value::Int64(1), Value::Utf8("x".to_string()), Value::Bool(true)]
        );
    }

    #[test]
    fn columns_follow_first_seen_order_and_missing_keys_are_null() {
        let ds = extract_json_from_str(r#"[{"b":1},{"a":2.5,"b":null}]"#).unwrap();
        assert_eq!(ds.columns, vec!["b", "a"]);
        assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::Null]);
        assert_eq!(ds.rows[1], vec![Value::Null, Value::Float64(2.5)]);
    }

    #[test]
    fn arrays_and_empty_objects_are_kept_as_json_text() {
        let ds = extract_json_from_str(r#"[{"tags":["x","y"],"meta":{}}]"#).unwrap();
        assert_eq!(ds.columns, vec!["tags", "meta"]);
        assert_eq!(ds.rows[0][0], Value::Utf8(r#"["x","y"]"#.to_string()));
        assert_eq!(ds.rows[0][1], Value::Utf8("{}".to_string()));
    }

    #[test]
    fn single_object_is_one_row() {
        let ds = extract_json_from_str(r#"{"id":7}"#).unwrap();
        assert_eq!(ds.row_count(), 1);
    }

    #[test]
    fn ndjson_is_accepted() {
        let ds = extract_json_from_str("{\"id\":1}\n\n{\"id\":2,\"u\":{\"n\":\"G\"}}\n").unwrap();
        assert_eq!(ds.columns, vec!["id", "u.n"]);
        assert_eq!(ds.row_count(), 2);
    }

    #[test]
    fn rejects_scalars_and_non_object_rows() {
        assert!(matches!(extract_json_from_str("42"), Err(ParseError::Malformed { .. })));
        let err = extract_json_from_str(r#"[{"a":1}, 3]"#).unwrap_err();
        assert!(err.to_string().contains("row 2 is not a json object"));
    }

    #[test]
    fn broken_array_reports_json_syntax_error() {
        let err = extract_json_from_str("[{\"a\":1},\n{\"a\":").unwrap_err();
        assert!(matches!(err, ParseError::Json(_)));
    }

    #[test]
    fn empty_array_is_an_empty_table() {
        let ds = extract_json_from_str("[]").unwrap();
        assert!(ds.columns.is_empty());
        assert_eq!(ds.row_count(), 0);
    }
}
