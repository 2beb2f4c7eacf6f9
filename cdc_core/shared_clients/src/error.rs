use common::error::diagnostics::DiagnosticMessage;
use common::error::UnsupportedEngineError;
use std::error::Error as StdError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbClientError {
    #[error("connection failed: {context}")]
    Connection {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
    #[error("query failed after {attempts} attempt(s): {context}")]
    Query {
        context: DiagnosticMessage,
        attempts: u32,
    },
    #[error("statement failed: {context}")]
    Statement { context: DiagnosticMessage },
    #[error("table already exists: {context}")]
    TableExists { context: DiagnosticMessage },
    #[error("unsafe identifier rejected: {context}")]
    InvalidIdentifier { context: DiagnosticMessage },
    #[error("transaction error: {context}")]
    Transaction { context: DiagnosticMessage },
    #[error("unsupported engine: {context}")]
    UnsupportedEngine { context: DiagnosticMessage },
    #[error("configuration error: {context}")]
    Config { context: DiagnosticMessage },
    #[error("I/O error: {context}")]
    Io {
        context: DiagnosticMessage,
        #[source]
        source: std::io::Error,
    },
}

impl DbClientError {
    #[track_caller]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }

    #[track_caller]
    pub fn connection_with<E>(message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let message = format!("{}: {}", message.into(), source);
        Self::Connection {
            context: DiagnosticMessage::new(message),
            source: Some(Box::new(source)),
        }
    }

    #[track_caller]
    pub fn query(message: impl Into<String>, attempts: u32) -> Self {
        Self::Query {
            context: DiagnosticMessage::new(message.into()),
            attempts,
        }
    }

    #[track_caller]
    pub fn statement(message: impl Into<String>) -> Self {
        Self::Statement {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn table_exists(table: impl Into<String>) -> Self {
        Self::TableExists {
            context: DiagnosticMessage::new(format!("table '{}' already exists", table.into())),
        }
    }

    #[track_caller]
    pub fn invalid_identifier(name: impl Into<String>) -> Self {
        Self::InvalidIdentifier {
            context: DiagnosticMessage::new(format!("'{}' is not a plain identifier", name.into())),
        }
    }

    #[track_caller]
    pub fn transaction(message: impl Into<String>) -> Self {
        Self::Transaction {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    pub fn is_connection(&self) -> bool {
        matches!(self, DbClientError::Connection { .. })
    }
}

impl From<std::io::Error> for DbClientError {
    #[track_caller]
    fn from(err: std::io::Error) -> Self {
        let message = err.to_string();
        DbClientError::Io {
            context: DiagnosticMessage::new(message),
            source: err,
        }
    }
}

impl From<UnsupportedEngineError> for DbClientError {
    fn from(err: UnsupportedEngineError) -> Self {
        DbClientError::UnsupportedEngine {
            context: err.context,
        }
    }
}

impl From<tokio_postgres::Error> for DbClientError {
    #[track_caller]
    fn from(err: tokio_postgres::Error) -> Self {
        if err.is_closed() {
            return DbClientError::connection_with("postgres connection closed", err);
        }
        match err.as_db_error() {
            Some(db) => DbClientError::statement(format!(
                "{} (SQLSTATE {})",
                db.message(),
                db.code().code()
            )),
            None => DbClientError::statement(err.to_string()),
        }
    }
}

impl From<mysql_async::Error> for DbClientError {
    #[track_caller]
    fn from(err: mysql_async::Error) -> Self {
        match err {
            mysql_async::Error::Io(_) | mysql_async::Error::Driver(_) => {
                DbClientError::connection_with("mysql connection failed", err)
            }
            other => DbClientError::statement(other.to_string()),
        }
    }
}

impl From<tiberius::error::Error> for DbClientError {
    #[track_caller]
    fn from(err: tiberius::error::Error) -> Self {
        match err {
            tiberius::error::Error::Io { .. } | tiberius::error::Error::Tls(_) => {
                DbClientError::connection_with("sql server connection failed", err)
            }
            other => DbClientError::statement(other.to_string()),
        }
    }
}

impl From<oracle::Error> for DbClientError {
    #[track_caller]
    fn from(err: oracle::Error) -> Self {
        DbClientError::statement(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DbClientError {
    #[track_caller]
    fn from(err: tokio::task::JoinError) -> Self {
        DbClientError::statement(format!("blocking database task failed: {err}"))
    }
}
