//! Tests against a MySQL server.
//!
//! The unreachable-host test always runs. The others need a live server and are skipped unless
//! `ETL_TEST_MYSQL_HOST` is set (credentials from `ETL_TEST_MYSQL_USER`/`ETL_TEST_MYSQL_PASSWORD`);
//! the user must be allowed to create and drop databases.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::mysql::{MySql, MySqlConnection};
use sqlx::Connection;

use tabular_etl::database::{ConnectionParams, LoadTarget, MySqlTarget};
use tabular_etl::ingestion::{FileFormat, InputFile};
use tabular_etl::observability::PipelineObserver;
use tabular_etl::pipeline::{run, RunRequest, RunState, Step};
use tabular_etl::types::{DataSet, Value};
use tabular_etl::ProvisioningError;

struct Quiet;
impl PipelineObserver for Quiet {}

fn target() -> MySqlTarget {
    MySqlTarget::new()
        .unwrap()
        .with_connect_timeout(Some(Duration::from_secs(5)))
}

fn live_params() -> Option<ConnectionParams> {
    let host = std::env::var("ETL_TEST_MYSQL_HOST").ok()?;
    let user = std::env::var("ETL_TEST_MYSQL_USER").unwrap_or_else(|_| "root".to_string());
    let password = std::env::var("ETL_TEST_MYSQL_PASSWORD").unwrap_or_default();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    Some(ConnectionParams::new(&host, user, password, format!("tabular_etl_test_{nanos}")))
}

fn block_on<F: Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}

async fn connect(params: &ConnectionParams, with_database: bool) -> MySqlConnection {
    MySqlConnection::connect_with(&params.connect_options(with_database))
        .await
        .unwrap()
}

fn database_exists(params: &ConnectionParams) -> bool {
    block_on(async {
        let mut conn = connect(params, false).await;
        let n = sqlx::query_scalar::<MySql, i64>(
            "SELECT COUNT(*) FROM information_schema.schemata WHERE schema_name = ?",
        )
        .bind(&params.database)
        .fetch_one(&mut conn)
        .await
        .unwrap();
        conn.close().await.unwrap();
        n > 0
    })
}

fn row_count(params: &ConnectionParams, table: &str) -> i64 {
    block_on(async {
        let mut conn = connect(params, true).await;
        let sql = format!("SELECT COUNT(*) FROM `{table}`");
        let n = sqlx::query_scalar::<MySql, i64>(&sql)
            .fetch_one(&mut conn)
            .await
            .unwrap();
        conn.close().await.unwrap();
        n
    })
}

fn execute(params: &ConnectionParams, sql: &str) {
    block_on(async {
        let mut conn = connect(params, true).await;
        sqlx::raw_sql(sql).execute(&mut conn).await.unwrap();
        conn.close().await.unwrap();
    })
}

fn table_exists(params: &ConnectionParams, table: &str) -> bool {
    block_on(async {
        let mut conn = connect(params, true).await;
        let n = sqlx::query_scalar::<MySql, i64>(
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_name = ?",
        )
        .bind(table)
        .fetch_one(&mut conn)
        .await
        .unwrap();
        conn.close().await.unwrap();
        n > 0
    })
}

fn drop_database(params: &ConnectionParams) {
    block_on(async {
        let mut conn = connect(params, false).await;
        let sql = format!("DROP DATABASE IF EXISTS `{}`", params.database);
        sqlx::raw_sql(&sql).execute(&mut conn).await.unwrap();
        conn.close().await.unwrap();
    })
}

#[test]
fn provisioning_against_unreachable_host_fails_and_halts_the_run() {
    let params = ConnectionParams::new("127.0.0.1:1", "nobody", "secret", "never_created");
    let target = target();

    let err = target.ensure_database(&params).unwrap_err();
    assert!(
        matches!(err, ProvisioningError::Connect { .. } | ProvisioningError::Timeout { .. }),
        "{err:?}"
    );

    let input = InputFile::new("a.csv", b"a\n1\n".to_vec(), FileFormat::Csv);
    let report = run(&RunRequest::new(Some(input), params, "t"), &target, &Quiet);
    assert_eq!(report.state, RunState::Failed(Step::Provision));
    assert!(report.rows_loaded.is_none());
}

#[test]
fn provisioning_creates_a_missing_database() {
    let Some(params) = live_params() else { return };
    let target = target();

    assert!(!database_exists(&params));
    target.ensure_database(&params).unwrap();
    assert!(database_exists(&params));
    // Idempotent.
    target.ensure_database(&params).unwrap();

    drop_database(&params);
}

#[test]
fn loading_into_an_existing_table_replaces_its_rows() {
    let Some(params) = live_params() else { return };
    let target = target();
    target.ensure_database(&params).unwrap();

    let first = DataSet::new(
        vec!["id".into(), "name".into()],
        (1..=5)
            .map(|i| vec![Value::Int64(i), Value::Utf8(format!("n{i}"))])
            .collect(),
    )
    .unwrap();
    let stats = target.replace_table(&params, "people", &first).unwrap();
    assert_eq!(stats.rows, 5);
    assert!(!stats.replaced_existing);
    assert_eq!(row_count(&params, "people"), 5);

    let second = DataSet::new(
        vec!["id".into(), "score".into(), "active".into()],
        vec![
            vec![Value::Int64(1), Value::Float64(1.5), Value::Bool(true)],
            vec![Value::Null, Value::Int64(2), Value::Null],
        ],
    )
    .unwrap();
    let stats = target.replace_table(&params, "people", &second).unwrap();
    assert_eq!(stats.rows, 2);
    assert!(stats.replaced_existing);
    assert_eq!(row_count(&params, "people"), 2);

    drop_database(&params);
}

#[test]
fn failed_load_leaves_the_existing_table_alone() {
    let Some(params) = live_params() else { return };
    let target = target();
    target.ensure_database(&params).unwrap();

    let good = DataSet::new(vec!["id".into()], vec![vec![Value::Int64(1)], vec![Value::Int64(2)]]).unwrap();
    target.replace_table(&params, "keep", &good).unwrap();

    // MySQL rejects identifiers longer than 64 characters.
    let bad = DataSet::new(vec!["x".repeat(80)], vec![vec![Value::Int64(9)]]).unwrap();
    assert!(target.replace_table(&params, "keep", &bad).is_err());
    assert_eq!(row_count(&params, "keep"), 2);

    drop_database(&params);
}

#[test]
fn loading_leaves_similarly_named_tables_alone() {
    let Some(params) = live_params() else { return };
    let target = target();
    target.ensure_database(&params).unwrap();

    execute(&params, "CREATE TABLE `keep__previous` (id BIGINT)");
    execute(&params, "CREATE TABLE `keep__staging` (id BIGINT)");
    execute(&params, "INSERT INTO `keep__previous` VALUES (1), (2), (3)");

    let data = DataSet::new(vec!["id".into()], vec![vec![Value::Int64(7)]]).unwrap();
    target.replace_table(&params, "keep", &data).unwrap();
    // Second load goes through the swap path.
    target.replace_table(&params, "keep", &data).unwrap();

    assert!(table_exists(&params, "keep__previous"));
    assert!(table_exists(&params, "keep__staging"));
    assert_eq!(row_count(&params, "keep__previous"), 3);
    assert_eq!(row_count(&params, "keep"), 1);

    drop_database(&params);
}

#[test]
fn table_names_up_to_the_identifier_limit_load() {
    let Some(params) = live_params() else { return };
    let target = target();
    target.ensure_database(&params).unwrap();

    let table = "t".repeat(64);
    let data = DataSet::new(vec!["id".into()], vec![vec![Value::Int64(1)]]).unwrap();
    target.replace_table(&params, &table, &data).unwrap();
    let stats = target.replace_table(&params, &table, &data).unwrap();
    assert!(stats.replaced_existing);
    assert_eq!(row_count(&params, &table), 1);

    drop_database(&params);
}
