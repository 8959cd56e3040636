//! Ensure the destination database exists.

use std::time::Duration;

use sqlx::Connection;

use crate::error::ProvisioningError;

use super::params::{quote_identifier, ConnectionParams};
use super::{connect, ConnectFailure};

/// `CREATE DATABASE IF NOT EXISTS` for `name`, with the name quoted as an identifier.
pub fn create_database_sql(name: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", quote_identifier(name))
}

/// Connect without selecting a schema and create `params.database` if it is missing.
pub(crate) async fn ensure_database(
    params: &ConnectionParams,
    connect_timeout: Option<Duration>,
) -> Result<(), ProvisioningError> {
    if params.database.is_empty() {
        return Err(ProvisioningError::EmptyName);
    }

    let mut conn = connect(&params.connect_options(false), connect_timeout)
        .await
        .map_err(|e| match e {
            ConnectFailure::Timeout => ProvisioningError::Timeout {
                host: params.address(),
            },
            ConnectFailure::Driver(source) => ProvisioningError::Connect {
                host: params.address(),
                source,
            },
        })?;

    let sql = create_database_sql(&params.database);
    tracing::debug!(%sql, url = %params.redacted_url(), "provisioning database");
    sqlx::raw_sql(&sql)
        .execute(&mut conn)
        .await
        .map_err(|source| ProvisioningError::Rejected {
            database: params.database.clone(),
            source,
        })?;

    if let Err(e) = conn.close().await {
        tracing::debug!(error = %e, "closing provisioning connection failed");
    }
    Ok(())
}
