//! A thin async adapter that exposes a generic SQL connection over PostgreSQL.
//!
//! Build a [`ConnectionConfig`], [`open`](SqlConnectionAdapter::open) it with
//! network credentials, and run raw SQL with
//! [`execute_sql`](SqlConnectionAdapter::execute_sql). Pooling is handled by
//! `bb8`, the wire protocol by `tokio-postgres`.
//!
//! ```rust,no_run
//! use pg_sql_adapter::prelude::*;
//!
//! # async fn run() -> Result<(), SqlAdapterError> {
//! let adapter = connect("db.example.com", "orders", "alice", "secret", None, None).await?;
//! let rs = adapter.execute_sql("SELECT 1 AS one").await?;
//! assert_eq!(rs.results[0].get("one"), Some(&RowValues::Int(1)));
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod error;
pub mod pool;
pub mod postgres;
pub mod prelude;
pub mod results;
pub mod types;

pub use adapter::{STATEMENT_LOG_TARGET, SqlConnection, SqlConnectionAdapter, connect};
pub use config::{ConnectionConfig, ConnectionUri, Credentials, NetworkCredentials};
pub use error::SqlAdapterError;
pub use pool::{Connector, PoolStatus, SqlClient};
pub use postgres::{PgConnector, PgManager};
pub use results::{CustomDbRow, ResultSet};
pub use types::RowValues;
