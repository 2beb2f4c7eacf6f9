pub mod error;
pub mod introspect;
pub mod kafka;
pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod prometheus;
pub mod row;

pub use error::DbClientError;
pub use introspect::{create_introspector, introspector_for, SchemaIntrospector};
pub use row::{Row, SqlParam};

use crate::mssql::MssqlClient;
use crate::mysql::MysqlClient;
use crate::oracle::OracleClient;
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use common::types::{ConnectionConfig, EngineKind};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, warn};

pub const DEFAULT_QUERY_RETRIES: u32 = 3;
const BACKOFF_STEP: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryOptions {
    /// Memoize the result for the lifetime of the client. Only for side-effect free reads.
    pub use_cache: bool,
    /// Total attempts before giving up. Zero is treated as one.
    pub retries: u32,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            use_cache: false,
            retries: DEFAULT_QUERY_RETRIES,
        }
    }
}

impl QueryOptions {
    pub fn cached() -> Self {
        Self {
            use_cache: true,
            ..Self::default()
        }
    }

    /// Single attempt, no cache. Used for DDL and other statements with side effects.
    pub fn once() -> Self {
        Self {
            use_cache: false,
            retries: 1,
        }
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }
}

/// Linear backoff: attempt × 200ms.
pub fn backoff_for(attempt: u32) -> Duration {
    BACKOFF_STEP * attempt
}

/// Per-client memo of read results keyed by the exact statement and parameters.
#[derive(Debug, Default)]
pub struct QueryCache {
    entries: HashMap<String, Vec<Row>>,
}

impl QueryCache {
    pub fn key(sql: &str, params: &[SqlParam]) -> String {
        let params = serde_json::to_string(params).unwrap_or_default();
        format!("{sql}|{params}")
    }

    pub fn get(&self, key: &str) -> Option<Vec<Row>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: String, rows: Vec<Row>) {
        self.entries.insert(key, rows);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Uniform access to one database engine.
///
/// An instance owns at most one connection and one open transaction and must
/// not be shared between concurrent logical operations.
#[async_trait]
pub trait DbEngineClient: Send + Sync {
    fn engine(&self) -> EngineKind;

    fn is_connected(&self) -> bool;

    async fn connect(&mut self) -> Result<(), DbClientError>;

    /// One attempt at running `sql` with the engine's placeholder syntax.
    async fn execute_raw(&mut self, sql: &str, params: &[SqlParam])
        -> Result<Vec<Row>, DbClientError>;

    async fn begin_transaction(&mut self) -> Result<(), DbClientError>;

    /// Commits and always releases the transaction's connection, even on failure.
    async fn commit(&mut self) -> Result<(), DbClientError>;

    /// Rolls back and always releases the transaction's connection, even on failure.
    async fn rollback(&mut self) -> Result<(), DbClientError>;

    /// Idempotent; safe without a prior `connect`. Close errors are logged, not returned.
    async fn disconnect(&mut self);

    fn cache_mut(&mut self) -> &mut QueryCache;

    async fn query(
        &mut self,
        sql: &str,
        params: &[SqlParam],
        options: QueryOptions,
    ) -> Result<Vec<Row>, DbClientError> {
        let cache_key = options.use_cache.then(|| QueryCache::key(sql, params));
        if let Some(rows) = cache_key.as_deref().and_then(|key| self.cache_mut().get(key)) {
            return Ok(rows);
        }

        if !self.is_connected() {
            self.connect().await?;
        }

        let attempts = options.retries.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.execute_raw(sql, params).await {
                Ok(rows) => {
                    if let Some(key) = cache_key {
                        self.cache_mut().insert(key, rows.clone());
                    }
                    return Ok(rows);
                }
                Err(err) if attempt < attempts => {
                    warn!(
                        engine = %self.engine(),
                        attempt,
                        "query failed, retrying: {err}"
                    );
                    tokio::time::sleep(backoff_for(attempt)).await;
                }
                Err(err) => {
                    error!(engine = %self.engine(), attempt, "query failed: {err}");
                    return Err(DbClientError::query(err.to_string(), attempt));
                }
            }
        }
    }

    /// Run a statement once, without caching or retries.
    async fn execute(&mut self, sql: &str, params: &[SqlParam]) -> Result<(), DbClientError> {
        self.query(sql, params, QueryOptions::once()).await.map(|_| ())
    }
}

pub type BoxedDbClient = Box<dyn DbEngineClient>;

/// Select the client implementation for the connection's engine. Nothing is
/// opened until `connect` or the first query.
pub fn create_db_client(config: &ConnectionConfig) -> BoxedDbClient {
    match config.engine {
        EngineKind::Postgres => Box::new(PostgresClient::new(config.clone())),
        EngineKind::Mysql => Box::new(MysqlClient::new(config.clone())),
        EngineKind::Mssql => Box::new(MssqlClient::new(config.clone())),
        EngineKind::Oracle => Box::new(OracleClient::new(config.clone())),
    }
}

/// Hands out database clients to services, so callers can swap in scripted
/// clients without touching a live engine.
pub trait DbClientFactory: Send + Sync {
    fn client(&self, config: &ConnectionConfig) -> BoxedDbClient;

    fn introspector(&self, config: &ConnectionConfig) -> Box<dyn SchemaIntrospector> {
        introspector_for(config.clone(), self.client(config))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineClientFactory;

impl DbClientFactory for EngineClientFactory {
    fn client(&self, config: &ConnectionConfig) -> BoxedDbClient {
        create_db_client(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::VecDeque;

    /// Fails a configurable number of times before answering.
    struct FlakyClient {
        connected: bool,
        failures_left: u32,
        calls: u32,
        cache: QueryCache,
    }

    impl FlakyClient {
        fn new(failures: u32) -> Self {
            Self {
                connected: false,
                failures_left: failures,
                calls: 0,
                cache: QueryCache::default(),
            }
        }
    }

    #[async_trait]
    impl DbEngineClient for FlakyClient {
        fn engine(&self) -> EngineKind {
            EngineKind::Postgres
        }
        fn is_connected(&self) -> bool {
            self.connected
        }
        async fn connect(&mut self) -> Result<(), DbClientError> {
            self.connected = true;
            Ok(())
        }
        async fn execute_raw(
            &mut self,
            _sql: &str,
            _params: &[SqlParam],
        ) -> Result<Vec<Row>, DbClientError> {
            self.calls += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(DbClientError::statement("deadlock detected"));
            }
            Ok(vec![Row::from_pairs([("n", json!(self.calls))])])
        }
        async fn begin_transaction(&mut self) -> Result<(), DbClientError> {
            Ok(())
        }
        async fn commit(&mut self) -> Result<(), DbClientError> {
            Ok(())
        }
        async fn rollback(&mut self) -> Result<(), DbClientError> {
            Ok(())
        }
        async fn disconnect(&mut self) {
            self.connected = false;
        }
        fn cache_mut(&mut self) -> &mut QueryCache {
            &mut self.cache
        }
    }

    #[test]
    fn backoff_grows_linearly() {
        let steps: VecDeque<_> = (1..=3).map(backoff_for).collect();
        assert_eq!(
            steps,
            VecDeque::from(vec![
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(600)
            ])
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let mut client = FlakyClient::new(2);
        let rows = client
            .query("SELECT 1", &[], QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(client.calls, 3);
        assert_eq!(rows[0].get_i64("n"), Some(3));
        assert!(client.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_with_attempt_count() {
        let mut client = FlakyClient::new(10);
        let err = client
            .query("SELECT 1", &[], QueryOptions::default().with_retries(2))
            .await
            .unwrap_err();
        assert!(matches!(err, DbClientError::Query { attempts: 2, .. }));
        assert_eq!(client.calls, 2);
    }

    #[tokio::test]
    async fn cache_is_keyed_by_sql_and_params() {
        let mut client = FlakyClient::new(0);
        let a = SqlParam::from("orders");
        let b = SqlParam::from("customers");
        client
            .query("SELECT $1", std::slice::from_ref(&a), QueryOptions::cached())
            .await
            .unwrap();
        client
            .query("SELECT $1", std::slice::from_ref(&a), QueryOptions::cached())
            .await
            .unwrap();
        assert_eq!(client.calls, 1);

        client
            .query("SELECT $1", std::slice::from_ref(&b), QueryOptions::cached())
            .await
            .unwrap();
        assert_eq!(client.calls, 2);

        client
            .query("SELECT $1", std::slice::from_ref(&a), QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(client.calls, 3);
    }

    #[test]
    fn factory_matches_engine() {
        for engine in EngineKind::ALL {
            let cfg = ConnectionConfig::new(engine, "h", engine.default_port(), "u", "p", "d");
            let client = create_db_client(&cfg);
            assert_eq!(client.engine(), engine);
            assert!(!client.is_connected());
        }
    }
}
