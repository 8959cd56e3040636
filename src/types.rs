//! Core data model types.
//!
//! Extraction produces an untyped, in-memory [`DataSet`]: an ordered list of column names and
//! row-major [`Value`] cells. Column types are not declared up front; they are inferred from the
//! cells when a typed view is needed (see [`DataSet::column_types`]).

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::ParseError;

/// Logical data type inferred for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
}

/// A single cell value in a [`DataSet`].
///
/// Unlike a plain `f64`, `Float64` cells compare by bit pattern (with `-0.0` folded into `0.0`),
/// so `Value` is `Eq + Hash` and whole rows can be deduplicated through a hash set.
#[derive(Debug, Clone)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The type of this cell, or `None` for [`Value::Null`].
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Bool(_) => Some(DataType::Bool),
            Value::Utf8(_) => Some(DataType::Utf8),
        }
    }
}

fn float_bits(f: f64) -> u64 {
    if f == 0.0 { 0.0f64.to_bits() } else { f.to_bits() }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => float_bits(*a) == float_bits(*b),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Utf8(a), Value::Utf8(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Int64(v) => v.hash(state),
            Value::Float64(v) => float_bits(*v).hash(state),
            Value::Bool(v) => v.hash(state),
            Value::Utf8(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int64(v) => write!(f, "{v}"),
            // `{:?}` keeps the fraction on integral floats (`2.0`, not `2`).
            Value::Float64(v) => write!(f, "{v:?}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Utf8(v) => f.write_str(v),
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>`; every row has exactly `columns.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSet {
    /// Column names, in first-seen order.
    pub columns: Vec<String>,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from column names and rows.
    ///
    /// Fails if any row's length differs from the number of columns.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, ParseError> {
        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(ParseError::Malformed {
                message: format!(
                    "row {} has {} cells but there are {} columns",
                    idx + 1,
                    row.len(),
                    columns.len()
                ),
            });
        }
        Ok(Self { columns, rows })
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Returns the index of a column by name, if present.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// A copy of the first `n` rows (the preview shown after each step).
    pub fn head(&self, n: usize) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Create a new dataset containing only rows that match `predicate`.
    ///
    /// The returned dataset preserves the original columns.
    pub fn filter_rows<F>(&self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self
            .rows
            .iter()
            .filter(|row| predicate(row.as_slice()))
            .cloned()
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Infer one [`DataType`] per column from its non-null cells.
    ///
    /// - all `Int64` → `Int64`; a mix of `Int64` and `Float64` → `Float64`; all `Bool` → `Bool`
    /// - anything else (strings, other mixes, or an all-null column) → `Utf8`
    pub fn column_types(&self) -> Vec<DataType> {
        (0..self.columns.len())
            .map(|idx| infer_column_type(self.rows.iter().filter_map(|row| row.get(idx))))
            .collect()
    }
}

fn infer_column_type<'a>(cells: impl Iterator<Item = &'a Value>) -> DataType {
    let mut acc: Option<DataType> = None;
    for cell in cells {
        let Some(t) = cell.data_type() else { continue };
        acc = Some(match (acc, t) {
            (None, t) => t,
            (Some(a), t) if a == t => a,
            (Some(DataType::Int64), DataType::Float64) | (Some(DataType::Float64), DataType::Int64) => {
                DataType::Float64
            }
            _ => return DataType::Utf8,
        });
    }
    acc.unwrap_or(DataType::Utf8)
}

impl fmt::Display for DataSet {
    /// Renders an aligned plain-text table (header, separator, one line per row).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|v| v.to_string()).collect())
            .collect();

        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let line = |f: &mut fmt::Formatter<'_>, items: &[String]| -> fmt::Result {
            let padded: Vec<String> = items
                .iter()
                .zip(&widths)
                .map(|(s, w)| format!("{s:<width$}", width = *w))
                .collect();
            writeln!(f, "{}", padded.join(" | ").trim_end())
        };

        line(f, &self.columns)?;
        let sep: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", sep.join("-+-"))?;
        for row in &cells {
            line(f, row)?;
        }
        Ok(())
    }
}

/// Normalize a table or column name: trim, lowercase, and replace spaces with underscores.
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}
