use crate::kafka::connectors::base::CaptureCommon;
use crate::kafka::errors::ConnectorBuildError;
use crate::kafka::{ConnectorBuildData, ConnectorBuilder, ConnectorDescriptor, HasConnectorClass};
use common::types::{ConnectorRole, EngineKind};
use serde::Serialize;

pub const CONNECTOR_CLASS_NAME: &str = "io.debezium.connector.sqlserver.SqlServerConnector";

/// SQL Server capture reads the change tables CDC maintains, so the database
/// and each selected table must have CDC enabled before this is deployed.
#[derive(Serialize, Debug, Clone)]
pub struct DebeziumSqlServerSourceConnector {
    #[serde(rename = "connector.class")]
    pub connector_class: String,

    #[serde(flatten)]
    pub common: CaptureCommon,

    #[serde(rename = "database.names")]
    database_names: String,
    #[serde(rename = "database.encrypt")]
    encrypt: bool,
    #[serde(rename = "database.trustServerCertificate")]
    trust_server_certificate: bool,
    #[serde(rename = "snapshot.max.threads")]
    snapshot_max_threads: u32,
}

impl DebeziumSqlServerSourceConnector {
    pub fn new(data: &ConnectorBuildData) -> Result<Self, ConnectorBuildError> {
        let conn = &data.pipeline.source;
        Ok(Self {
            connector_class: CONNECTOR_CLASS_NAME.to_string(),
            common: CaptureCommon::new(data)?,
            database_names: conn.database.clone(),
            encrypt: conn.tls.is_some(),
            trust_server_certificate: conn.tls.as_ref().map_or(true, |tls| tls.accept_invalid_certs),
            snapshot_max_threads: 4,
        })
    }
}

impl HasConnectorClass for DebeziumSqlServerSourceConnector {
    fn connector_class(&self) -> &str {
        &self.connector_class
    }
}

pub struct MssqlCaptureBuilder;

impl ConnectorBuilder for MssqlCaptureBuilder {
    fn engine(&self) -> EngineKind {
        EngineKind::Mssql
    }

    fn role(&self) -> ConnectorRole {
        ConnectorRole::Capture
    }

    fn build(&self, data: &ConnectorBuildData) -> Result<ConnectorDescriptor, ConnectorBuildError> {
        let connector = DebeziumSqlServerSourceConnector::new(data)?;
        ConnectorDescriptor::from_parts(&data.names.capture, &connector, None, None)
    }
}
