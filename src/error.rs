use thiserror::Error;

#[derive(Debug, Error)]
pub enum SqlAdapterError {
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Adapter is not open; call `open` before executing statements")]
    NotOpen,
}

impl From<bb8::RunError<SqlAdapterError>> for SqlAdapterError {
    fn from(err: bb8::RunError<SqlAdapterError>) -> Self {
        match err {
            bb8::RunError::User(inner) => inner,
            bb8::RunError::TimedOut => SqlAdapterError::ConnectionError(
                "timed out waiting for a pooled connection".to_string(),
            ),
        }
    }
}
