//! Database provisioning and load.
//!
//! The pipeline talks to the destination through the [`LoadTarget`] trait. [`MySqlTarget`] is the
//! production implementation: it drives `sqlx`'s MySQL driver on a private single-threaded
//! `tokio` runtime, so every call blocks the caller until the server answers.

pub mod load;
pub mod params;
pub mod provision;

use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlConnection};
use sqlx::Connection;
use tokio::runtime::{Builder, Runtime};

use crate::error::{LoadError, ProvisioningError};
use crate::types::DataSet;

pub use load::LoadStats;
pub use params::{
    normalize_table_name, quote_identifier, ConnectionParams, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_TABLE,
};

/// Default limit on how long establishing a connection may take.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Destination of a pipeline run.
pub trait LoadTarget {
    /// Make sure `params.database` exists, creating it if needed.
    fn ensure_database(&self, params: &ConnectionParams) -> Result<(), ProvisioningError>;

    /// Write `data` as `table` in `params.database`, replacing any existing table of that name.
    fn replace_table(
        &self,
        params: &ConnectionParams,
        table: &str,
        data: &DataSet,
    ) -> Result<LoadStats, LoadError>;
}

/// A MySQL server reached over the network.
pub struct MySqlTarget {
    runtime: Runtime,
    connect_timeout: Option<Duration>,
}

impl std::fmt::Debug for MySqlTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlTarget")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl MySqlTarget {
    /// Create a target with its own runtime and the default connect timeout.
    pub fn new() -> std::io::Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            connect_timeout: Some(DEFAULT_CONNECT_TIMEOUT),
        })
    }

    /// Override the connect timeout. `None` waits indefinitely.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

impl LoadTarget for MySqlTarget {
    fn ensure_database(&self, params: &ConnectionParams) -> Result<(), ProvisioningError> {
        self.runtime
            .block_on(provision::ensure_database(params, self.connect_timeout))
    }

    fn replace_table(
        &self,
        params: &ConnectionParams,
        table: &str,
        data: &DataSet,
    ) -> Result<LoadStats, LoadError> {
        self.runtime
            .block_on(load::replace_table(params, table, data, self.connect_timeout))
    }
}

pub(crate) enum ConnectFailure {
    Timeout,
    Driver(sqlx::Error),
}

pub(crate) async fn connect(
    opts: &MySqlConnectOptions,
    timeout: Option<Duration>,
) -> Result<MySqlConnection, ConnectFailure> {
    let attempt = MySqlConnection::connect_with(opts);
    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, attempt)
            .await
            .map_err(|_| ConnectFailure::Timeout)?,
        None => attempt.await,
    };
    result.map_err(ConnectFailure::Driver)
}
