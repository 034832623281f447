// PostgreSQL backend for the adapter
//
// - manager: bb8 connection manager and the `Connector` used by the adapter
// - query: raw statement execution and row extraction

pub mod manager;
pub mod query;

pub use manager::{PgConnector, PgManager};
pub use query::{build_result_set_from_statement, postgres_extract_value};
