#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bb8::ManageConnection;
use pg_sql_adapter::prelude::*;

/// Counters shared between a test and every mock pool it creates.
#[derive(Default)]
pub struct MockState {
    pub managers_created: AtomicU64,
    pub uris: Mutex<Vec<String>>,
    pub connects: AtomicUsize,
    pub live_by_generation: Mutex<HashMap<u64, usize>>,
    pub queries: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub query_delay_ms: AtomicU64,
}

impl MockState {
    pub fn live(&self, generation: u64) -> usize {
        self.live_by_generation
            .lock()
            .unwrap()
            .get(&generation)
            .copied()
            .unwrap_or(0)
    }

    pub fn recorded_uris(&self) -> Vec<String> {
        self.uris.lock().unwrap().clone()
    }
}

#[derive(Clone, Default)]
pub struct MockConnector {
    pub state: Arc<MockState>,
}

impl Connector for MockConnector {
    type Manager = MockManager;

    fn manager(&self, uri: &ConnectionUri) -> Result<Self::Manager, SqlAdapterError> {
        let generation = self.state.managers_created.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.uris.lock().unwrap().push(uri.as_str().to_string());
        Ok(MockManager {
            generation,
            state: self.state.clone(),
        })
    }
}

pub struct MockManager {
    generation: u64,
    state: Arc<MockState>,
}

impl ManageConnection for MockManager {
    type Connection = MockConnection;
    type Error = SqlAdapterError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        if self.state.fail_connect.load(Ordering::SeqCst) {
            return Err(SqlAdapterError::ConnectionError(
                "connection refused".to_string(),
            ));
        }
        self.state.connects.fetch_add(1, Ordering::SeqCst);
        *self
            .state
            .live_by_generation
            .lock()
            .unwrap()
            .entry(self.generation)
            .or_insert(0) += 1;
        Ok(MockConnection {
            generation: self.generation,
            state: self.state.clone(),
        })
    }

    async fn is_valid(&self, _conn: &mut Self::Connection) -> Result<(), Self::Error> {
        Ok(())
    }

    fn has_broken(&self, _conn: &mut Self::Connection) -> bool {
        false
    }
}

/// Answers every statement with one row `(one = 1, generation = <pool generation>)`.
/// Statements starting with `BAD` fail like a syntax error would.
pub struct MockConnection {
    generation: u64,
    state: Arc<MockState>,
}

impl SqlClient for MockConnection {
    async fn query_rows(&mut self, statement: &str) -> Result<ResultSet, SqlAdapterError> {
        let now = self.state.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.state.queries.fetch_add(1, Ordering::SeqCst);

        let delay = self.state.query_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.state.in_flight.fetch_sub(1, Ordering::SeqCst);

        if statement.starts_with("BAD") {
            return Err(SqlAdapterError::ExecutionError(format!(
                "syntax error at or near \"{statement}\""
            )));
        }

        let mut rs = ResultSet::with_capacity(1);
        rs.set_column_names(Arc::new(vec!["one".to_string(), "generation".to_string()]));
        let generation = i64::try_from(self.generation).unwrap();
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Int(generation)]);
        Ok(rs)
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        if let Ok(mut live) = self.state.live_by_generation.lock() {
            if let Some(count) = live.get_mut(&self.generation) {
                *count -= 1;
            }
        }
    }
}

pub fn mock_adapter(config: ConnectionConfig) -> (SqlConnectionAdapter<MockConnector>, Arc<MockState>) {
    let connector = MockConnector::default();
    let state = connector.state.clone();
    (SqlConnectionAdapter::with_connector(config, connector), state)
}
