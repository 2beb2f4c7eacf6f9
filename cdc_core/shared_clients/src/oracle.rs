use crate::{DbClientError, DbEngineClient, QueryCache, Row, SqlParam};
use async_trait::async_trait;
use common::types::{ConnectionConfig, EngineKind};
use oracle::sql_type::{OracleType, ToSql};
use oracle::{Connection, SqlValue};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Oracle client. The driver is blocking, so every call hops onto the
/// blocking pool with a shared handle to the session.
pub struct OracleClient {
    config: ConnectionConfig,
    conn: Option<Arc<Connection>>,
    in_transaction: bool,
    cache: QueryCache,
}

impl OracleClient {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            conn: None,
            in_transaction: false,
            cache: QueryCache::default(),
        }
    }

    fn connect_string(&self) -> String {
        format!(
            "//{}:{}/{}",
            self.config.host, self.config.port, self.config.database
        )
    }

    fn conn(&self) -> Result<Arc<Connection>, DbClientError> {
        self.conn
            .clone()
            .ok_or_else(|| DbClientError::connection("oracle client is not connected"))
    }
}

fn is_row_returning(sql: &str) -> bool {
    let head = sql.trim_start().to_ascii_uppercase();
    head.starts_with("SELECT") || head.starts_with("WITH")
}

fn bind_values(params: &[SqlParam]) -> Vec<Box<dyn ToSql>> {
    params
        .iter()
        .map(|p| -> Box<dyn ToSql> {
            match p {
                SqlParam::Null => Box::new(None::<String>),
                SqlParam::Bool(b) => Box::new(i64::from(*b)),
                SqlParam::Int(i) => Box::new(*i),
                SqlParam::Float(f) => Box::new(*f),
                SqlParam::Text(s) => Box::new(s.clone()),
            }
        })
        .collect()
}

fn oracle_value(value: &SqlValue) -> Value {
    if value.is_null().unwrap_or(true) {
        return Value::Null;
    }
    match value.oracle_type() {
        Ok(OracleType::Number(_, 0)) | Ok(OracleType::Int64) => {
            value.get::<i64>().map(Value::from).unwrap_or(Value::Null)
        }
        Ok(OracleType::Number(..))
        | Ok(OracleType::Float(_))
        | Ok(OracleType::BinaryFloat)
        | Ok(OracleType::BinaryDouble) => value.get::<f64>().map(Value::from).unwrap_or(Value::Null),
        _ => value.get::<String>().map(Value::from).unwrap_or(Value::Null),
    }
}

fn run_blocking(
    conn: &Connection,
    sql: &str,
    params: &[SqlParam],
    autocommit: bool,
) -> Result<Vec<Row>, DbClientError> {
    let owned = bind_values(params);
    let refs: Vec<&dyn ToSql> = owned.iter().map(|p| p.as_ref()).collect();

    if is_row_returning(sql) {
        let result = conn.query(sql, &refs)?;
        let columns: Vec<String> = result
            .column_info()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        let mut rows = Vec::new();
        for row in result {
            let row = row?;
            let values = row.sql_values().iter().map(oracle_value).collect();
            rows.push(Row::new(columns.clone(), values));
        }
        Ok(rows)
    } else {
        conn.execute(sql, &refs)?;
        if autocommit {
            conn.commit()?;
        }
        Ok(Vec::new())
    }
}

#[async_trait]
impl DbEngineClient for OracleClient {
    fn engine(&self) -> EngineKind {
        EngineKind::Oracle
    }

    fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    async fn connect(&mut self) -> Result<(), DbClientError> {
        if self.conn.is_some() {
            return Ok(());
        }
        let user = self.config.username.clone();
        let password = self.config.password.clone();
        let connect_string = self.connect_string();
        let conn = tokio::task::spawn_blocking(move || {
            Connection::connect(user, password, connect_string)
        })
        .await?
        .map_err(|e| {
            DbClientError::connection_with(
                format!("failed to connect to oracle at {}", self.config.host),
                e,
            )
        })?;
        debug!(host = %self.config.host, service = %self.config.database, "oracle connected");
        self.conn = Some(Arc::new(conn));
        Ok(())
    }

    async fn execute_raw(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Row>, DbClientError> {
        let conn = self.conn()?;
        let sql = sql.to_string();
        let params = params.to_vec();
        let autocommit = !self.in_transaction;
        tokio::task::spawn_blocking(move || run_blocking(&conn, &sql, &params, autocommit)).await?
    }

    async fn begin_transaction(&mut self) -> Result<(), DbClientError> {
        if self.in_transaction {
            return Err(DbClientError::transaction("a transaction is already open"));
        }
        // Oracle opens a transaction implicitly with the first DML statement.
        self.connect().await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DbClientError> {
        if !self.in_transaction {
            return Err(DbClientError::transaction("no open transaction to commit"));
        }
        self.in_transaction = false;
        let conn = self.conn()?;
        tokio::task::spawn_blocking(move || conn.commit()).await??;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbClientError> {
        if !self.in_transaction {
            return Err(DbClientError::transaction("no open transaction to roll back"));
        }
        self.in_transaction = false;
        let conn = self.conn()?;
        tokio::task::spawn_blocking(move || conn.rollback()).await??;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.in_transaction = false;
        if let Some(conn) = self.conn.take() {
            match tokio::task::spawn_blocking(move || conn.close()).await {
                Ok(Err(e)) => warn!("error while closing oracle connection: {e}"),
                Err(e) => warn!("oracle close task failed: {e}"),
                Ok(Ok(())) => {}
            }
        }
    }

    fn cache_mut(&mut self) -> &mut QueryCache {
        &mut self.cache
    }
}
