//! Materialized query results.
//!
//! - row: a single row with shared column names
//! - result_set: the buffered rows returned by one statement

pub mod result_set;
pub mod row;

pub use result_set::ResultSet;
pub use row::CustomDbRow;
