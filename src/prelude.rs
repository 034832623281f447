//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::adapter::{SqlConnection, SqlConnectionAdapter, connect};
pub use crate::config::{ConnectionConfig, ConnectionUri, Credentials, NetworkCredentials};
pub use crate::error::SqlAdapterError;
pub use crate::pool::{Connector, PoolStatus, SqlClient};
pub use crate::postgres::PgConnector;
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::types::RowValues;
