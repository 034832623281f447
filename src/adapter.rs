use async_trait::async_trait;
use bb8::{ManageConnection, Pool};

use crate::config::{ConnectionConfig, ConnectionUri, Credentials};
use crate::error::SqlAdapterError;
use crate::pool::{Connector, PoolStatus, SqlClient, start_pool, status_of};
use crate::postgres::PgConnector;
use crate::results::ResultSet;

/// Target for statement logging.
pub const STATEMENT_LOG_TARGET: &str = "pg_sql_adapter::statement";

/// A generic SQL connection: open with credentials, then run raw SQL.
#[async_trait]
pub trait SqlConnection: Send + Sync {
    /// Open the connection with the given credentials.
    async fn open(&mut self, credentials: Credentials) -> Result<(), SqlAdapterError>;

    /// Run a raw SQL statement and return all of its rows.
    async fn execute_sql(&self, statement: &str) -> Result<ResultSet, SqlAdapterError>;

    /// Pass-through schema name, if one was configured.
    fn schema(&self) -> Option<&str>;
}

enum PoolState<M: ManageConnection> {
    Unopened,
    Open {
        pool: Pool<M>,
        uri: ConnectionUri,
        generation: u64,
    },
}

/// Adapter from the generic [`SqlConnection`] calls to a pooled PostgreSQL client.
///
/// ```rust,no_run
/// use pg_sql_adapter::prelude::*;
///
/// # async fn run() -> Result<(), SqlAdapterError> {
/// let mut adapter = SqlConnectionAdapter::new(ConnectionConfig::new("localhost", "orders"));
/// adapter.open(Credentials::network("alice", "secret")).await?;
/// let rs = adapter.execute_sql("SELECT id, total FROM orders").await?;
/// for row in &rs {
///     println!("{:?}", row.get("total"));
/// }
/// # Ok(())
/// # }
/// ```
pub struct SqlConnectionAdapter<C: Connector = PgConnector> {
    config: ConnectionConfig,
    connector: C,
    state: PoolState<C::Manager>,
    pools_started: u64,
}

impl SqlConnectionAdapter<PgConnector> {
    #[must_use]
    pub fn new(config: ConnectionConfig) -> Self {
        Self::with_connector(config, PgConnector)
    }
}

impl<C: Connector> SqlConnectionAdapter<C> {
    /// Build an adapter that creates its pools through `connector`.
    #[must_use]
    pub fn with_connector(config: ConnectionConfig, connector: C) -> Self {
        Self {
            config,
            connector,
            state: PoolState::Unopened,
            pools_started: 0,
        }
    }

    /// Start a pool for these credentials.
    ///
    /// Calling `open` on an already open adapter starts a new pool and then
    /// closes the previous one. When the new pool cannot start, the previous
    /// one stays in use.
    ///
    /// # Errors
    /// Returns `SqlAdapterError::ConfigError` for non-network credentials or an
    /// invalid config (before any I/O), or the driver's error when the pool
    /// cannot start.
    pub async fn open(&mut self, credentials: Credentials) -> Result<(), SqlAdapterError> {
        let credentials = credentials.into_network()?;
        self.config.validate()?;

        let uri = self.config.connection_uri(&credentials);
        let pool = start_pool(&self.connector, &uri, &self.config).await?;

        self.pools_started += 1;
        let generation = self.pools_started;
        let previous = std::mem::replace(
            &mut self.state,
            PoolState::Open {
                pool,
                uri,
                generation,
            },
        );
        if let PoolState::Open {
            generation: old, ..
        } = previous
        {
            tracing::info!(old, new = generation, "replaced connection pool");
        }
        drop(previous);
        Ok(())
    }

    /// Run a raw SQL statement on a pooled connection.
    ///
    /// All rows are read before the connection goes back to the pool.
    ///
    /// # Errors
    /// Returns `SqlAdapterError::NotOpen` before a successful `open`, a
    /// `ConnectionError` when no connection frees up in time, or the
    /// driver's error for the statement itself.
    pub async fn execute_sql(&self, statement: &str) -> Result<ResultSet, SqlAdapterError> {
        let PoolState::Open { pool, .. } = &self.state else {
            tracing::error!("execute_sql called before open");
            return Err(SqlAdapterError::NotOpen);
        };

        tracing::debug!(target: STATEMENT_LOG_TARGET, sql = statement, "executing statement");

        let mut conn = pool.get().await?;
        let result_set = conn.query_rows(statement).await?;
        drop(conn);
        Ok(result_set)
    }

    /// Drop the current pool. Connections still checked out close when returned.
    pub fn close(&mut self) {
        if let PoolState::Open { generation, .. } =
            std::mem::replace(&mut self.state, PoolState::Unopened)
        {
            tracing::info!(generation, "closed connection pool");
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, PoolState::Open { .. })
    }

    /// Current pool counters, or `None` while unopened.
    #[must_use]
    pub fn pool_status(&self) -> Option<PoolStatus> {
        match &self.state {
            PoolState::Open {
                pool, generation, ..
            } => Some(status_of(pool, *generation)),
            PoolState::Unopened => None,
        }
    }

    /// URI of the pool in use, or `None` while unopened.
    #[must_use]
    pub fn connection_uri(&self) -> Option<&ConnectionUri> {
        match &self.state {
            PoolState::Open { uri, .. } => Some(uri),
            PoolState::Unopened => None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    #[must_use]
    pub fn schema(&self) -> Option<&str> {
        self.config.schema.as_deref()
    }
}

#[async_trait]
impl<C: Connector> SqlConnection for SqlConnectionAdapter<C> {
    async fn open(&mut self, credentials: Credentials) -> Result<(), SqlAdapterError> {
        SqlConnectionAdapter::open(self, credentials).await
    }

    async fn execute_sql(&self, statement: &str) -> Result<ResultSet, SqlAdapterError> {
        SqlConnectionAdapter::execute_sql(self, statement).await
    }

    fn schema(&self) -> Option<&str> {
        SqlConnectionAdapter::schema(self)
    }
}

/// Build an adapter, open it with network credentials, and hand it back ready to use.
///
/// `port` defaults to 5432; `query_parameters` are appended to the URI in order.
///
/// # Errors
/// Returns any error from [`SqlConnectionAdapter::open`].
pub async fn connect(
    host: &str,
    database: &str,
    user_name: &str,
    password: &str,
    port: Option<u16>,
    query_parameters: Option<Vec<(String, String)>>,
) -> Result<SqlConnectionAdapter, SqlAdapterError> {
    let mut config = ConnectionConfig::new(host, database);
    if let Some(port) = port {
        config = config.with_port(port);
    }
    if let Some(params) = query_parameters {
        config = config.with_query_parameters(params);
    }

    let mut adapter = SqlConnectionAdapter::new(config);
    adapter
        .open(Credentials::network(user_name, password))
        .await?;
    Ok(adapter)
}
