//! Pool plumbing shared by every backend.
//!
//! The adapter never talks to a driver directly. A [`Connector`] turns a
//! connection URI into a `bb8` manager, `bb8` owns checkout and release,
//! and the pooled connection only has to know how to run raw SQL
//! ([`SqlClient`]).

use std::future::Future;

use bb8::{ManageConnection, Pool};

use crate::config::{ConnectionConfig, ConnectionUri};
use crate::error::SqlAdapterError;
use crate::results::ResultSet;

/// A native connection that can run a raw SQL statement.
pub trait SqlClient: Send + 'static {
    /// Run `statement` and return every row it produced.
    ///
    /// The future resolves only after all rows have been read off the
    /// connection, so the caller may release the connection right after.
    fn query_rows(
        &mut self,
        statement: &str,
    ) -> impl Future<Output = Result<ResultSet, SqlAdapterError>> + Send;
}

/// Builds the `bb8` manager for one pool.
pub trait Connector: Send + Sync + 'static {
    type Manager: ManageConnection<Connection: SqlClient, Error = SqlAdapterError>;

    /// Create a manager that connects to `uri`.
    ///
    /// # Errors
    /// Returns the driver's error when the URI cannot be used.
    fn manager(&self, uri: &ConnectionUri) -> Result<Self::Manager, SqlAdapterError>;
}

/// Snapshot of a started pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// How many pools this adapter has started, this one included
    pub generation: u64,
    /// Open connections, idle or checked out
    pub connections: u32,
    pub idle_connections: u32,
}

/// Create a pool for `uri` and wait for its startup connections.
///
/// `bb8` opens `min_connections` connections before returning; the first
/// failure is returned unchanged. Connection attempts are not retried.
///
/// # Errors
/// Returns the connector's error or the first startup connection error.
pub(crate) async fn start_pool<C: Connector>(
    connector: &C,
    uri: &ConnectionUri,
    config: &ConnectionConfig,
) -> Result<Pool<C::Manager>, SqlAdapterError> {
    let manager = connector.manager(uri)?;

    let mut builder = Pool::builder()
        .max_size(config.max_connections)
        .min_idle(Some(config.min_connections))
        .retry_connection(false);
    if let Some(timeout) = config.connect_timeout() {
        builder = builder.connection_timeout(timeout);
    }

    let pool = builder.build(manager).await?;
    tracing::info!(
        uri = %uri,
        min = config.min_connections,
        max = config.max_connections,
        "connection pool started"
    );
    Ok(pool)
}

pub(crate) fn status_of<M: ManageConnection>(pool: &Pool<M>, generation: u64) -> PoolStatus {
    let state = pool.state();
    PoolStatus {
        generation,
        connections: state.connections,
        idle_connections: state.idle_connections,
    }
}
