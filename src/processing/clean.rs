//! The fixed cleaning pipeline applied when transformations are enabled.
//!
//! Steps run in this order, and the order matters (filling changes what dedupe considers equal):
//!
//! 1. [`drop_empty_rows`]: remove rows where every cell is null
//! 2. [`fill_empty`]: replace remaining nulls with an empty string
//! 3. [`normalize_columns`]: trim, lowercase, and underscore column names
//! 4. [`drop_duplicate_rows`]: remove exact duplicate rows, keeping the first

use std::collections::HashSet;

use crate::types::{normalize_name, DataSet, Value};

/// Apply the whole cleaning pipeline and return the cleaned dataset.
///
/// Applying `clean` to its own output returns the same dataset.
pub fn clean(dataset: &DataSet) -> DataSet {
    let mut out = drop_empty_rows(dataset);
    fill_empty(&mut out);
    normalize_columns(&mut out);
    drop_duplicate_rows(&out)
}

/// Returns a new [`DataSet`] without rows whose cells are all null.
pub fn drop_empty_rows(dataset: &DataSet) -> DataSet {
    dataset.filter_rows(|row| !row.iter().all(Value::is_null))
}

/// Replace every null cell with `Value::Utf8("")`, in place.
pub fn fill_empty(dataset: &mut DataSet) {
    for cell in dataset.rows.iter_mut().flatten() {
        if cell.is_null() {
            *cell = Value::Utf8(String::new());
        }
    }
}

/// Normalize column names in place (see [`normalize_name`]).
///
/// A normalized name that collides with an earlier column gets the first free `_1`, `_2`, ...
/// suffix, so column names stay unique.
pub fn normalize_columns(dataset: &mut DataSet) {
    let mut used: HashSet<String> = HashSet::with_capacity(dataset.columns.len());
    for column in dataset.columns.iter_mut() {
        let base = normalize_name(column);
        let name = if used.contains(&base) {
            (1..)
                .map(|n| format!("{base}_{n}"))
                .find(|candidate| !used.contains(candidate))
                .unwrap_or(base)
        } else {
            base
        };
        used.insert(name.clone());
        *column = name;
    }
}

/// Returns a new [`DataSet`] keeping only the first occurrence of each distinct row.
pub fn drop_duplicate_rows(dataset: &DataSet) -> DataSet {
    let mut seen: HashSet<&[Value]> = HashSet::with_capacity(dataset.row_count());
    let rows = dataset
        .rows
        .iter()
        .filter(|row| seen.insert(row.as_slice()))
        .cloned()
        .collect();
    DataSet {
        columns: dataset.columns.clone(),
        rows,
    }
}
