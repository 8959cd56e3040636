//! Destructive table load.
//!
//! Rows are written into a freshly named staging table inside one transaction and then swapped in
//! with a single `RENAME TABLE`. If anything fails before the swap, the staging table is dropped
//! and any existing destination table is left as it was. The only tables a load ever drops are
//! the helper tables it created itself.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::mysql::{MySql, MySqlConnection};
use sqlx::{Connection, QueryBuilder};

use crate::error::LoadError;
use crate::types::{DataSet, DataType, Value};

use super::params::{quote_identifier, ConnectionParams};
use super::{connect, ConnectFailure};

/// MySQL's limit on placeholders in one prepared statement.
const MAX_PLACEHOLDERS: usize = 65_535;
/// Upper bound on rows per multi-row `INSERT`.
const MAX_BATCH_ROWS: usize = 1_000;

/// Outcome of a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    /// Rows written to the table.
    pub rows: usize,
    /// Whether a table of the same name existed and was replaced.
    pub replaced_existing: bool,
}

/// A cell coerced to its column's SQL type.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

/// MySQL column type for an inferred [`DataType`].
pub fn sql_type(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Int64 => "BIGINT",
        DataType::Float64 => "DOUBLE",
        DataType::Bool => "BOOLEAN",
        DataType::Utf8 => "TEXT",
    }
}

/// `CREATE TABLE` with one nullable column per data set column.
pub fn create_table_sql(table: &str, columns: &[String], types: &[DataType]) -> String {
    let defs: Vec<String> = columns
        .iter()
        .zip(types)
        .map(|(name, t)| format!("{} {} NULL", quote_identifier(name), sql_type(*t)))
        .collect();
    format!("CREATE TABLE {} ({})", quote_identifier(table), defs.join(", "))
}

/// Coerce a cell to `column_type`. Numbers and bools in a text column are rendered as text.
pub fn coerce(value: &Value, column_type: DataType) -> SqlValue {
    match (value, column_type) {
        (Value::Null, _) => SqlValue::Null,
        (Value::Int64(i), DataType::Int64) => SqlValue::Int(*i),
        (Value::Int64(i), DataType::Float64) => SqlValue::Float(*i as f64),
        (Value::Float64(f), DataType::Float64) => SqlValue::Float(*f),
        (Value::Bool(b), DataType::Bool) => SqlValue::Bool(*b),
        (other, _) => SqlValue::Text(other.to_string()),
    }
}

/// Rows per `INSERT` for a table with `column_count` columns.
pub fn batch_rows(column_count: usize) -> usize {
    (MAX_PLACEHOLDERS / column_count.max(1)).clamp(1, MAX_BATCH_ROWS)
}

/// A fresh name for a helper table (`_etl_stage_<hex>` / `_etl_prev_<hex>`).
///
/// The name does not depend on the destination table, so it stays far below MySQL's 64-character
/// identifier limit whatever the table is called.
fn sidecar_name(role: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let token = RandomState::new().hash_one((nanos, std::process::id()));
    format!("_etl_{role}_{token:016x}")
}

async fn table_exists(conn: &mut MySqlConnection, name: &str) -> Result<bool, sqlx::Error> {
    let n = sqlx::query_scalar::<MySql, i64>(
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE table_schema = DATABASE() AND table_name = ?",
    )
    .bind(name)
    .fetch_one(&mut *conn)
    .await?;
    Ok(n > 0)
}

/// Pick a helper-table name that no table in the schema uses yet.
///
/// `CREATE TABLE` and `RENAME TABLE` both refuse an existing target, so even a name taken between
/// this check and its use can only make the load fail, never overwrite anything.
async fn unused_name(conn: &mut MySqlConnection, role: &str) -> Result<String, sqlx::Error> {
    let mut name = sidecar_name(role);
    for _ in 0..4 {
        if !table_exists(conn, &name).await? {
            break;
        }
        name = sidecar_name(role);
    }
    Ok(name)
}

/// Replace `table` in `params.database` with the contents of `data`.
pub(crate) async fn replace_table(
    params: &ConnectionParams,
    table: &str,
    data: &DataSet,
    connect_timeout: Option<Duration>,
) -> Result<LoadStats, LoadError> {
    if table.trim().is_empty() {
        return Err(LoadError::EmptyTableName);
    }
    if data.column_count() == 0 {
        return Err(LoadError::NoColumns);
    }

    let mut conn = connect(&params.connect_options(true), connect_timeout)
        .await
        .map_err(|e| match e {
            ConnectFailure::Timeout => LoadError::Timeout {
                host: params.address(),
            },
            ConnectFailure::Driver(source) => LoadError::Connect {
                host: params.address(),
                source,
            },
        })?;
    tracing::debug!(url = %params.redacted_url(), %table, rows = data.row_count(), "loading table");

    let result = load_via_staging(&mut conn, table, data).await;
    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "closing load connection failed");
    }
    result
}

async fn load_via_staging(
    conn: &mut MySqlConnection,
    table: &str,
    data: &DataSet,
) -> Result<LoadStats, LoadError> {
    let fail = |stage: &'static str| {
        move |source: sqlx::Error| LoadError::Statement {
            stage,
            table: table.to_string(),
            source,
        }
    };

    let staging = unused_name(conn, "stage")
        .await
        .map_err(fail("pick staging name"))?;
    let types = data.column_types();
    let create_sql = create_table_sql(&staging, &data.columns, &types);
    tracing::debug!(sql = %create_sql, "creating staging table");
    sqlx::raw_sql(&create_sql)
        .execute(&mut *conn)
        .await
        .map_err(fail("create table"))?;

    // From here on the staging table is ours and must not outlive a failure.
    let result = match write_rows(conn, table, &staging, data, &types).await {
        Ok(rows) => swap_in(conn, table, &staging)
            .await
            .map(|replaced_existing| LoadStats {
                rows,
                replaced_existing,
            }),
        Err(e) => Err(e),
    };
    if result.is_err() {
        let sql = format!("DROP TABLE IF EXISTS {}", quote_identifier(&staging));
        if let Err(e) = sqlx::raw_sql(&sql).execute(&mut *conn).await {
            tracing::warn!(error = %e, table = %staging, "failed to drop staging table");
        }
    }
    result
}

async fn write_rows(
    conn: &mut MySqlConnection,
    table: &str,
    staging: &str,
    data: &DataSet,
    types: &[DataType],
) -> Result<usize, LoadError> {
    let fail = |stage: &'static str| {
        move |source: sqlx::Error| LoadError::Statement {
            stage,
            table: table.to_string(),
            source,
        }
    };

    let column_list = data
        .columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");
    let insert_prefix = format!("INSERT INTO {} ({}) ", quote_identifier(staging), column_list);

    let mut tx = conn.begin().await.map_err(fail("begin transaction"))?;
    for chunk in data.rows.chunks(batch_rows(data.column_count())) {
        let coerced = chunk.iter().map(|row| {
            row.iter()
                .zip(types)
                .map(|(value, t)| coerce(value, *t))
                .collect::<Vec<_>>()
        });

        let mut qb: QueryBuilder<MySql> = QueryBuilder::new(&insert_prefix);
        qb.push_values(coerced, |mut b, row| {
            for cell in row {
                match cell {
                    SqlValue::Null => b.push_bind(None::<String>),
                    SqlValue::Int(i) => b.push_bind(i),
                    SqlValue::Float(f) => b.push_bind(f),
                    SqlValue::Bool(v) => b.push_bind(v),
                    SqlValue::Text(s) => b.push_bind(s),
                };
            }
        });
        qb.build()
            .execute(&mut *tx)
            .await
            .map_err(fail("insert rows"))?;
        tracing::debug!(rows = chunk.len(), table = %staging, "inserted batch");
    }
    tx.commit().await.map_err(fail("commit"))?;

    Ok(data.row_count())
}

/// Move `staging` into place as `table`. Returns whether an existing table was replaced.
async fn swap_in(conn: &mut MySqlConnection, table: &str, staging: &str) -> Result<bool, LoadError> {
    let fail = |stage: &'static str| {
        move |source: sqlx::Error| LoadError::Statement {
            stage,
            table: table.to_string(),
            source,
        }
    };

    if !table_exists(conn, table).await.map_err(fail("look up table"))? {
        let sql = format!(
            "RENAME TABLE {} TO {}",
            quote_identifier(staging),
            quote_identifier(table)
        );
        sqlx::raw_sql(&sql)
            .execute(&mut *conn)
            .await
            .map_err(fail("rename table"))?;
        return Ok(false);
    }

    let previous = unused_name(conn, "prev")
        .await
        .map_err(fail("pick previous-table name"))?;
    let swap = format!(
        "RENAME TABLE {t} TO {p}, {s} TO {t}",
        t = quote_identifier(table),
        p = quote_identifier(&previous),
        s = quote_identifier(staging),
    );
    sqlx::raw_sql(&swap)
        .execute(&mut *conn)
        .await
        .map_err(fail("swap tables"))?;

    // The new data is already in place; `previous` was created by the swap above.
    let drop_previous = format!("DROP TABLE {}", quote_identifier(&previous));
    if let Err(e) = sqlx::raw_sql(&drop_previous).execute(&mut *conn).await {
        tracing::warn!(error = %e, table = %previous, "failed to drop replaced table");
    }
    Ok(true)
}
