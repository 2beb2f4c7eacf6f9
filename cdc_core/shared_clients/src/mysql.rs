use crate::{DbClientError, DbEngineClient, QueryCache, Row, SqlParam};
use async_trait::async_trait;
use common::types::{ConnectionConfig, EngineKind};
use mysql_async::prelude::*;
use mysql_async::{Conn, OptsBuilder, Pool, SslOpts};
use serde_json::Value;
use tracing::{debug, warn};

/// MySQL and MariaDB client over a `mysql_async` pool. A transaction pins one
/// pooled connection until commit or rollback hands it back.
pub struct MysqlClient {
    config: ConnectionConfig,
    pool: Option<Pool>,
    tx_conn: Option<Conn>,
    cache: QueryCache,
}

impl MysqlClient {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            pool: None,
            tx_conn: None,
            cache: QueryCache::default(),
        }
    }

    fn opts(&self) -> OptsBuilder {
        let mut opts = OptsBuilder::default()
            .ip_or_hostname(self.config.host.clone())
            .tcp_port(self.config.port)
            .user(Some(self.config.username.clone()))
            .pass(Some(self.config.password.clone()))
            .db_name(Some(self.config.database.clone()));

        if let Some(tls) = &self.config.tls {
            let mut ssl = SslOpts::default().with_danger_accept_invalid_certs(tls.accept_invalid_certs);
            if let Some(path) = &tls.ca_cert_path {
                ssl = ssl.with_root_certs(vec![path.clone().into()]);
            }
            opts = opts.ssl_opts(Some(ssl));
        }
        opts
    }

    async fn pooled_conn(&self) -> Result<Conn, DbClientError> {
        let pool = self
            .pool
            .as_ref()
            .ok_or_else(|| DbClientError::connection("mysql client is not connected"))?;
        Ok(pool.get_conn().await?)
    }

    /// Finish the pinned transaction. The connection goes back to the pool
    /// whether or not the statement succeeds.
    async fn finish_transaction(&mut self, sql: &str) -> Result<(), DbClientError> {
        let mut conn = self
            .tx_conn
            .take()
            .ok_or_else(|| DbClientError::transaction("no open transaction"))?;
        let result = conn.query_drop(sql).await;
        drop(conn);
        Ok(result?)
    }
}

async fn run_on(
    conn: &mut Conn,
    sql: &str,
    params: &[SqlParam],
) -> Result<Vec<mysql_async::Row>, DbClientError> {
    let rows = if params.is_empty() {
        conn.query(sql).await?
    } else {
        let values: Vec<mysql_async::Value> = params.iter().map(to_mysql_value).collect();
        conn.exec(sql, values).await?
    };
    Ok(rows)
}

fn to_mysql_value(param: &SqlParam) -> mysql_async::Value {
    match param {
        SqlParam::Null => mysql_async::Value::NULL,
        SqlParam::Bool(b) => mysql_async::Value::from(*b),
        SqlParam::Int(i) => mysql_async::Value::from(*i),
        SqlParam::Float(f) => mysql_async::Value::from(*f),
        SqlParam::Text(s) => mysql_async::Value::from(s.clone()),
    }
}

fn to_json(value: mysql_async::Value) -> Value {
    match value {
        mysql_async::Value::NULL => Value::Null,
        mysql_async::Value::Bytes(bytes) => match String::from_utf8(bytes) {
            Ok(s) => Value::String(s),
            Err(e) => Value::String(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        },
        mysql_async::Value::Int(n) => Value::from(n),
        mysql_async::Value::UInt(n) => Value::from(n),
        mysql_async::Value::Float(f) => Value::from(f),
        mysql_async::Value::Double(d) => Value::from(d),
        other => Value::String(other.as_sql(true).trim_matches('\'').to_string()),
    }
}

fn convert_row(row: mysql_async::Row) -> Row {
    let columns = row
        .columns_ref()
        .iter()
        .map(|c| c.name_str().to_string())
        .collect();
    let values = (0..row.len())
        .map(|i| to_json(row.get::<mysql_async::Value, _>(i).unwrap_or(mysql_async::Value::NULL)))
        .collect();
    Row::new(columns, values)
}

#[async_trait]
impl DbEngineClient for MysqlClient {
    fn engine(&self) -> EngineKind {
        EngineKind::Mysql
    }

    fn is_connected(&self) -> bool {
        self.pool.is_some()
    }

    async fn connect(&mut self) -> Result<(), DbClientError> {
        if self.pool.is_some() {
            return Ok(());
        }
        let pool = Pool::new(self.opts());
        // The pool is lazy; check out one connection so bad credentials fail here.
        let conn = pool.get_conn().await.map_err(|e| {
            DbClientError::connection_with(
                format!("failed to connect to mysql at {}", self.config.host),
                e,
            )
        })?;
        drop(conn);
        debug!(host = %self.config.host, db = %self.config.database, "mysql connected");
        self.pool = Some(pool);
        Ok(())
    }

    async fn execute_raw(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Row>, DbClientError> {
        let rows = match self.tx_conn.as_mut() {
            Some(conn) => run_on(conn, sql, params).await?,
            None => {
                let mut conn = self.pooled_conn().await?;
                run_on(&mut conn, sql, params).await?
            }
        };
        Ok(rows.into_iter().map(convert_row).collect())
    }

    async fn begin_transaction(&mut self) -> Result<(), DbClientError> {
        if self.tx_conn.is_some() {
            return Err(DbClientError::transaction("a transaction is already open"));
        }
        self.connect().await?;
        let mut conn = self.pooled_conn().await?;
        conn.query_drop("START TRANSACTION").await?;
        self.tx_conn = Some(conn);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DbClientError> {
        self.finish_transaction("COMMIT").await
    }

    async fn rollback(&mut self) -> Result<(), DbClientError> {
        self.finish_transaction("ROLLBACK").await
    }

    async fn disconnect(&mut self) {
        self.tx_conn = None;
        if let Some(pool) = self.pool.take() {
            if let Err(e) = pool.disconnect().await {
                warn!("error while closing mysql pool: {e}");
            }
        }
    }

    fn cache_mut(&mut self) -> &mut QueryCache {
        &mut self.cache
    }
}
