use crate::{DbClientError, DbEngineClient, QueryCache, Row, SqlParam};
use async_trait::async_trait;
use common::types::{ConnectionConfig, EngineKind, TlsConfig};
use postgres_native_tls::MakeTlsConnector;
use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error};

type BoxedParam = Box<dyn ToSql + Sync + Send>;

pub struct PostgresClient {
    config: ConnectionConfig,
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
    in_transaction: bool,
    cache: QueryCache,
}

impl PostgresClient {
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            config,
            client: None,
            driver: None,
            in_transaction: false,
            cache: QueryCache::default(),
        }
    }

    fn pg_config(&self) -> tokio_postgres::Config {
        let mut cfg = tokio_postgres::Config::new();
        cfg.host(&self.config.host)
            .port(self.config.port)
            .user(&self.config.username)
            .password(&self.config.password)
            .dbname(&self.config.database)
            .application_name("cdcctl");
        cfg
    }

    fn client(&self) -> Result<&Client, DbClientError> {
        self.client
            .as_ref()
            .ok_or_else(|| DbClientError::connection("postgres client is not connected"))
    }
}

pub(crate) fn tls_connector(tls: &TlsConfig) -> Result<native_tls::TlsConnector, DbClientError> {
    let mut builder = native_tls::TlsConnector::builder();
    if let Some(path) = &tls.ca_cert_path {
        let pem = std::fs::read(path)?;
        let cert = native_tls::Certificate::from_pem(&pem)
            .map_err(|e| DbClientError::connection_with("invalid CA certificate", e))?;
        builder.add_root_certificate(cert);
    }
    builder.danger_accept_invalid_certs(tls.accept_invalid_certs);
    builder
        .build()
        .map_err(|e| DbClientError::connection_with("failed to build TLS connector", e))
}

fn to_pg_params(params: &[SqlParam]) -> Vec<BoxedParam> {
    params
        .iter()
        .map(|p| -> BoxedParam {
            match p {
                SqlParam::Null => Box::new(None::<String>),
                SqlParam::Bool(b) => Box::new(*b),
                SqlParam::Int(i) => Box::new(*i),
                SqlParam::Float(f) => Box::new(*f),
                SqlParam::Text(s) => Box::new(s.clone()),
            }
        })
        .collect()
}

fn pg_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> Value {
    let value = match *ty {
        Type::BOOL => row.try_get::<_, Option<bool>>(idx).ok().flatten().map(Value::from),
        Type::INT2 => row.try_get::<_, Option<i16>>(idx).ok().flatten().map(Value::from),
        Type::INT4 => row.try_get::<_, Option<i32>>(idx).ok().flatten().map(Value::from),
        Type::INT8 => row.try_get::<_, Option<i64>>(idx).ok().flatten().map(Value::from),
        Type::FLOAT4 => row.try_get::<_, Option<f32>>(idx).ok().flatten().map(Value::from),
        Type::FLOAT8 => row.try_get::<_, Option<f64>>(idx).ok().flatten().map(Value::from),
        _ => row.try_get::<_, Option<String>>(idx).ok().flatten().map(Value::from),
    };
    value.unwrap_or(Value::Null)
}

fn convert_row(row: &tokio_postgres::Row) -> Row {
    let columns = row.columns();
    let names = columns.iter().map(|c| c.name().to_string()).collect();
    let values = columns
        .iter()
        .enumerate()
        .map(|(idx, col)| pg_value(row, idx, col.type_()))
        .collect();
    Row::new(names, values)
}

#[async_trait]
impl DbEngineClient for PostgresClient {
    fn engine(&self) -> EngineKind {
        EngineKind::Postgres
    }

    fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| !c.is_closed())
    }

    async fn connect(&mut self) -> Result<(), DbClientError> {
        if self.is_connected() {
            return Ok(());
        }
        let cfg = self.pg_config();
        let (client, driver) = match &self.config.tls {
            Some(tls) => {
                let connector = MakeTlsConnector::new(tls_connector(tls)?);
                let (client, connection) = cfg.connect(connector).await.map_err(|e| {
                    DbClientError::connection_with(
                        format!("failed to connect to postgres at {}", self.config.host),
                        e,
                    )
                })?;
                let driver = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("postgres driver task exited: {e}");
                    }
                });
                (client, driver)
            }
            None => {
                let (client, connection) = cfg.connect(NoTls).await.map_err(|e| {
                    DbClientError::connection_with(
                        format!("failed to connect to postgres at {}", self.config.host),
                        e,
                    )
                })?;
                let driver = tokio::spawn(async move {
                    if let Err(e) = connection.await {
                        error!("postgres driver task exited: {e}");
                    }
                });
                (client, driver)
            }
        };
        debug!(host = %self.config.host, db = %self.config.database, "postgres connected");
        self.client = Some(client);
        self.driver = Some(driver);
        Ok(())
    }

    async fn execute_raw(
        &mut self,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<Row>, DbClientError> {
        let client = self.client()?;
        let boxed = to_pg_params(params);
        let refs: Vec<&(dyn ToSql + Sync)> = boxed
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();
        let rows = client.query(sql, &refs).await?;
        Ok(rows.iter().map(convert_row).collect())
    }

    async fn begin_transaction(&mut self) -> Result<(), DbClientError> {
        if self.in_transaction {
            return Err(DbClientError::transaction("a transaction is already open"));
        }
        if !self.is_connected() {
            self.connect().await?;
        }
        self.client()?.batch_execute("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DbClientError> {
        if !self.in_transaction {
            return Err(DbClientError::transaction("no open transaction to commit"));
        }
        self.in_transaction = false;
        self.client()?.batch_execute("COMMIT").await?;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbClientError> {
        if !self.in_transaction {
            return Err(DbClientError::transaction("no open transaction to roll back"));
        }
        self.in_transaction = false;
        self.client()?.batch_execute("ROLLBACK").await?;
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.in_transaction = false;
        self.client = None;
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }

    fn cache_mut(&mut self) -> &mut QueryCache {
        &mut self.cache
    }
}
