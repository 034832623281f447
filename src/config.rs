use std::fmt;
use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

use crate::error::SqlAdapterError;

pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_MIN_CONNECTIONS: u32 = 2;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

const URI_SCHEME: &str = "postgres";
const REDACTED: &str = "***";

// RFC 3986 unreserved characters stay literal, everything else is escaped.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Connection settings for one adapter.
///
/// ```rust
/// use pg_sql_adapter::prelude::*;
///
/// let cfg = ConnectionConfig::new("db.example.com", "orders")
///     .with_query_parameter("application_name", "billing")
///     .with_pool_size(1, 4);
/// assert_eq!(cfg.port, 5432);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub database: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Appended to the URI in this order
    #[serde(default)]
    pub query_parameters: Vec<(String, String)>,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Upper bound on waiting for a pooled connection; the pool default applies when unset
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,
    /// Carried for callers that need it; the adapter never reads it
    #[serde(default)]
    pub schema: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_min_connections() -> u32 {
    DEFAULT_MIN_CONNECTIONS
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

impl ConnectionConfig {
    #[must_use]
    pub fn new(host: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            database: database.into(),
            port: DEFAULT_PORT,
            query_parameters: Vec::new(),
            min_connections: DEFAULT_MIN_CONNECTIONS,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            connect_timeout_ms: None,
            schema: None,
        }
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_query_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_parameters.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub fn with_query_parameters<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query_parameters
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn with_pool_size(mut self, min_connections: u32, max_connections: u32) -> Self {
        self.min_connections = min_connections;
        self.max_connections = max_connections;
        self
    }

    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[must_use]
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_ms.map(Duration::from_millis)
    }

    /// Check the settings the pool cannot work without.
    ///
    /// # Errors
    /// Returns `SqlAdapterError::ConfigError` naming the first offending field.
    pub fn validate(&self) -> Result<(), SqlAdapterError> {
        if self.host.is_empty() {
            return Err(SqlAdapterError::ConfigError("host is required".to_string()));
        }
        if self.database.is_empty() {
            return Err(SqlAdapterError::ConfigError(
                "database is required".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(SqlAdapterError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(SqlAdapterError::ConfigError(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        Ok(())
    }

    /// Build `postgres://<user>:<password>@<host>:<port>/<database>?<params>`.
    #[must_use]
    pub fn connection_uri(&self, credentials: &NetworkCredentials) -> ConnectionUri {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        let user = encode(&credentials.username);
        let authority_tail = format!("@{host}:{}/{}", self.port, encode(&self.database));

        let mut query = String::new();
        for (i, (key, value)) in self.query_parameters.iter().enumerate() {
            query.push(if i == 0 { '?' } else { '&' });
            query.push_str(&encode(key));
            query.push('=');
            query.push_str(&encode(value));
        }

        ConnectionUri {
            uri: format!(
                "{URI_SCHEME}://{user}:{}{authority_tail}{query}",
                encode(&credentials.password)
            ),
            redacted: format!("{URI_SCHEME}://{user}:{REDACTED}{authority_tail}{query}"),
        }
    }
}

fn encode(component: &str) -> String {
    utf8_percent_encode(component, COMPONENT).to_string()
}

/// A username/password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct NetworkCredentials {
    pub username: String,
    pub password: String,
}

impl NetworkCredentials {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for NetworkCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkCredentials")
            .field("username", &self.username)
            .field("password", &REDACTED)
            .finish()
    }
}

/// Credentials a caller may hand to `open`.
///
/// Only `Network` is usable with PostgreSQL; the other kinds exist for the
/// generic connection interface and are rejected by the adapter.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Network(NetworkCredentials),
    Token { token: String },
    Anonymous,
}

impl Credentials {
    #[must_use]
    pub fn network(username: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials::Network(NetworkCredentials::new(username, password))
    }

    /// Take the username/password pair out of these credentials.
    ///
    /// # Errors
    /// Returns `SqlAdapterError::ConfigError` for any variant other than `Network`.
    pub fn into_network(self) -> Result<NetworkCredentials, SqlAdapterError> {
        match self {
            Credentials::Network(creds) => Ok(creds),
            Credentials::Token { .. } | Credentials::Anonymous => Err(SqlAdapterError::ConfigError(
                "expecting network credentials".to_string(),
            )),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Credentials::Network(_) => "Network",
            Credentials::Token { .. } => "Token",
            Credentials::Anonymous => "Anonymous",
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Network(creds) => f.debug_tuple("Network").field(creds).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

impl From<NetworkCredentials> for Credentials {
    fn from(creds: NetworkCredentials) -> Self {
        Credentials::Network(creds)
    }
}

/// A built connection URI.
///
/// `Display` and `Debug` hide the password; use [`ConnectionUri::as_str`]
/// for the real value.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionUri {
    uri: String,
    redacted: String,
}

impl ConnectionUri {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.uri
    }

    #[must_use]
    pub fn redacted(&self) -> &str {
        &self.redacted
    }
}

impl fmt::Display for ConnectionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted)
    }
}

impl fmt::Debug for ConnectionUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ConnectionUri").field(&self.redacted).finish()
    }
}
