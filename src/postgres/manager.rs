use std::future::Future;
use std::str::FromStr;

use bb8::ManageConnection;
use tokio_postgres::{Client, NoTls};

use crate::config::ConnectionUri;
use crate::error::SqlAdapterError;
use crate::pool::Connector;

/// bb8 manager for Postgres clients.
pub struct PgManager {
    pub(crate) config: tokio_postgres::Config,
}

impl PgManager {
    #[must_use]
    pub fn new(config: tokio_postgres::Config) -> Self {
        Self { config }
    }

    /// Parse a connection URI into a manager.
    ///
    /// # Errors
    /// Returns `SqlAdapterError::PostgresError` if the driver rejects the URI.
    pub fn from_uri(uri: &ConnectionUri) -> Result<Self, SqlAdapterError> {
        let config = tokio_postgres::Config::from_str(uri.as_str())?;
        Ok(Self::new(config))
    }
}

impl ManageConnection for PgManager {
    type Connection = Client;
    type Error = SqlAdapterError;

    #[allow(clippy::manual_async_fn)]
    fn connect(&self) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send {
        let cfg = self.config.clone();
        async move {
            tracing::debug!(
                hosts = ?cfg.get_hosts(),
                db = ?cfg.get_dbname(),
                user = ?cfg.get_user(),
                "postgres connect start"
            );
            let (client, connection) = cfg.connect(NoTls).await?;
            tokio::spawn(async move {
                if let Err(e) = connection.await {
                    tracing::warn!(error = %e, "postgres connection task ended");
                }
            });
            Ok(client)
        }
    }

    #[allow(clippy::manual_async_fn)]
    fn is_valid(
        &self,
        conn: &mut Self::Connection,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        async move {
            conn.simple_query("SELECT 1").await?;
            Ok(())
        }
    }

    fn has_broken(&self, conn: &mut Self::Connection) -> bool {
        conn.is_closed()
    }
}

/// The default [`Connector`]: plain TCP connections through `tokio-postgres`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

impl Connector for PgConnector {
    type Manager = PgManager;

    fn manager(&self, uri: &ConnectionUri) -> Result<Self::Manager, SqlAdapterError> {
        PgManager::from_uri(uri)
    }
}
