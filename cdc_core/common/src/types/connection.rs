use crate::types::engine::EngineKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifier handed out by the catalog for a stored connection.
pub type ConnectionId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TlsConfig {
    /// PEM encoded CA bundle used to verify the server certificate.
    pub ca_cert_path: Option<PathBuf>,
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

/// Everything needed to open a session against one database.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub engine: EngineKind,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsConfig>,
}

/// Structural identity of a connection. Two configs with the same identity
/// refer to the same stored connection even if their credentials differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConnectionIdentity {
    pub engine: EngineKind,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl ConnectionConfig {
    pub fn new(
        engine: EngineKind,
        host: impl Into<String>,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            host: host.into(),
            port,
            username: username.into(),
            password: password.into(),
            database: database.into(),
            schema: None,
            tls: None,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    pub fn identity(&self) -> ConnectionIdentity {
        ConnectionIdentity {
            engine: self.engine,
            host: self.host.trim().to_ascii_lowercase(),
            port: self.port,
            database: self.database.trim().to_string(),
        }
    }

    /// Schema used when the config does not name one explicitly.
    pub fn schema_or_default(&self) -> String {
        if let Some(schema) = self.schema.as_ref().filter(|s| !s.trim().is_empty()) {
            return schema.clone();
        }
        match self.engine {
            EngineKind::Postgres => "public".to_string(),
            EngineKind::Mssql => "dbo".to_string(),
            EngineKind::Mysql => self.database.clone(),
            EngineKind::Oracle => self.username.to_ascii_uppercase(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .field("schema", &self.schema)
            .field("tls", &self.tls)
            .finish()
    }
}
