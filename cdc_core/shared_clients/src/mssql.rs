use crate::{DbClientError, DbEngineClient, QueryCache, Row, SqlParam};
use async_trait::async_trait;
use common::types::{ConnectionConfig, EngineKind};
use serde_json::Value;
use std::borrow::Cow;
use tiberius::{AuthMethod, Client, ColumnData, Config, ToSql};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::{debug, warn};

type TdsClient = Client<Compat<TcpStream>>;

pub struct MssqlClient {
    config: ConnectionConfig,
    client: Option<TdsClient>,
    in_transaction: bool,
    cache: QueryCache,
}

impl MssqlClient {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            client: None,
            in_transaction: false,
            cache: QueryCache::default(),
        }
    }

    fn tds_config(&self) -> Result<Config, DbClientError> {
        let mut cfg = Config::new();
        cfg.host(&self.config.host);
        cfg.port(self.config.port);
        cfg.database(&self.config.database);
        cfg.application_name("cdcctl");
        cfg.authentication(AuthMethod::sql_server(
            &self.config.username,
            &self.config.password,
        ));

        match &self.config.tls {
            Some(tls) if tls.accept_invalid_certs => cfg.trust_cert(),
            Some(tls) => match &tls.ca_cert_path {
                Some(path) => {
                    let path = path.to_str().ok_or_else(|| {
                        DbClientError::config("CA certificate path is not valid UTF-8")
                    })?;
                    cfg.trust_cert_ca(path)
                }
                None => {}
            },
            // Self-signed certificates are the norm for SQL Server installs.
            None => cfg.trust_cert(),
        }
        Ok(cfg)
    }

    fn client_mut(&mut self) -> Result<&mut TdsClient, DbClientError> {
        self.client
            .as_mut()
            .ok_or_else(|| DbClientError::connection("sql server client is not connected"))
    }

    async fn run_plain(&mut self, sql: &str) -> Result<(), DbClientError> {
        self.client_mut()?.simple_query(sql).await?.into_results().await?;
        Ok(())
    }
}

/// Owned parameter bound through TDS RPC parameters.
struct TdsParam(SqlParam);

impl ToSql for TdsParam {
    fn to_sql(&self) -> ColumnData<'_> {
        match &self.0 {
            SqlParam::Null => ColumnData::String(None),
            SqlParam::Bool(b) => ColumnData::Bit(Some(*b)),
            SqlParam::Int(i) => ColumnData::I64(Some(*i)),
            SqlParam::Float(f) => ColumnData::F64(Some(*f)),
            SqlParam::Text(s) => ColumnData::String(Some(Cow::Borrowed(s.as_str()))),
        }
    }
}

fn tds_value(row: &tiberius::Row, idx: usize) -> Value {
    if let Ok(Some(v)) = row.try_get::<bool, _>(idx) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<u8, _>(idx) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<i16, _>(idx) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<i32, _>(idx) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<i64, _>(idx) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<f32, _>(idx) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<f64, _>(idx) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<&str, _>(idx) {
        return Value::from(v);
    }
    Value::Null
}

fn convert_row(row: &tiberius::Row) -> Row {
    let columns = row.columns().iter().map(|c| c.name().to_string()).collect();
    let values = (0..row.len()).map(|idx| tds_value(row, idx)).collect();
    Row::new(columns, values)
}

#[async_trait]
impl DbEngineClient for MssqlClient {
    fn engine(&self) -> EngineKind {
        EngineKind::Mssql
    }

    fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    async fn connect(&mut self) -> Result<(), DbClientError> {
        if self.client.is_some() {
            return Ok(());
        }
        let cfg = self.tds_config()?;
        let tcp = TcpStream::connect(cfg.get_addr()).await.map_err(|e| {
            DbClientError::connection_with(
                format!("failed to reach sql server at {}", self.config.host),
                e,
            )
        })?;
        tcp.set_nodelay(true).ok();
        let client = Client::connect(cfg, tcp.compat_write())
            .await
            .map_err(|e| DbClientError::connection_with("sql server login failed", e))?;
        debug!(host = %self.config.host, db = %self.config.database, "sql server connected");
        self.client = Some(client);
        Ok(())
    }

    async fn execute_raw(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Row>, DbClientError> {
        let client = self.client_mut()?;
        let stream = if params.is_empty() {
            client.simple_query(sql).await?
        } else {
            let owned: Vec<TdsParam> = params.iter().cloned().map(TdsParam).collect();
            let refs: Vec<&dyn ToSql> = owned.iter().map(|p| p as &dyn ToSql).collect();
            client.query(sql, &refs).await?
        };
        let rows = stream.into_first_result().await?;
        Ok(rows.iter().map(convert_row).collect())
    }

    async fn begin_transaction(&mut self) -> Result<(), DbClientError> {
        if self.in_transaction {
            return Err(DbClientError::transaction("a transaction is already open"));
        }
        self.connect().await?;
        self.run_plain("BEGIN TRANSACTION").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DbClientError> {
        if !self.in_transaction {
            return Err(DbClientError::transaction("no open transaction to commit"));
        }
        self.in_transaction = false;
        self.run_plain("COMMIT TRANSACTION").await
    }

    async fn rollback(&mut self) -> Result<(), DbClientError> {
        if !self.in_transaction {
            return Err(DbClientError::transaction("no open transaction to roll back"));
        }
        self.in_transaction = false;
        self.run_plain("ROLLBACK TRANSACTION").await
    }

    async fn disconnect(&mut self) {
        self.in_transaction = false;
        if let Some(client) = self.client.take() {
            if let Err(e) = client.close().await {
                warn!("error while closing sql server connection: {e}");
            }
        }
    }

    fn cache_mut(&mut self) -> &mut QueryCache {
        &mut self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::TlsConfig;

    #[test]
    fn params_bind_as_tds_columns() {
        assert!(matches!(
            TdsParam(SqlParam::Null).to_sql(),
            ColumnData::String(None)
        ));
        assert!(matches!(
            TdsParam(SqlParam::Int(7)).to_sql(),
            ColumnData::I64(Some(7))
        ));
        assert!(matches!(
            TdsParam(SqlParam::Bool(true)).to_sql(),
            ColumnData::Bit(Some(true))
        ));
    }

    #[test]
    fn builds_config_with_ca_path() {
        let cfg = ConnectionConfig::new(EngineKind::Mssql, "erp", 1433, "sa", "pw", "erp")
            .with_tls(TlsConfig {
                ca_cert_path: Some("/etc/ssl/erp.pem".into()),
                accept_invalid_certs: false,
            });
        let client = MssqlClient::new(cfg);
        assert_eq!(client.tds_config().unwrap().get_addr(), "erp:1433");
    }
}
