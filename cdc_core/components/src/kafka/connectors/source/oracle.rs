use crate::kafka::connectors::base::CaptureCommon;
use crate::kafka::errors::ConnectorBuildError;
use crate::kafka::{ConnectorBuildData, ConnectorBuilder, ConnectorDescriptor, HasConnectorClass};
use common::types::{ConnectorRole, EngineKind};
use serde::Serialize;

pub const CONNECTOR_CLASS_NAME: &str = "io.debezium.connector.oracle.OracleConnector";

#[derive(Serialize, Debug, Clone)]
pub struct DebeziumOracleSourceConnector {
    #[serde(rename = "connector.class")]
    pub connector_class: String,

    #[serde(flatten)]
    pub common: CaptureCommon,

    #[serde(rename = "database.dbname")]
    dbname: String,
    #[serde(rename = "database.connection.adapter")]
    connection_adapter: String,
    #[serde(rename = "log.mining.strategy")]
    log_mining_strategy: String,
    #[serde(rename = "snapshot.max.threads")]
    snapshot_max_threads: u32,
}

impl DebeziumOracleSourceConnector {
    pub fn new(data: &ConnectorBuildData) -> Result<Self, ConnectorBuildError> {
        Ok(Self {
            connector_class: CONNECTOR_CLASS_NAME.to_string(),
            common: CaptureCommon::new(data)?,
            dbname: data.pipeline.source.database.clone(),
            connection_adapter: "logminer".to_string(),
            log_mining_strategy: "online_catalog".to_string(),
            snapshot_max_threads: 4,
        })
    }
}

impl HasConnectorClass for DebeziumOracleSourceConnector {
    fn connector_class(&self) -> &str {
        &self.connector_class
    }
}

pub struct OracleCaptureBuilder;

impl ConnectorBuilder for OracleCaptureBuilder {
    fn engine(&self) -> EngineKind {
        EngineKind::Oracle
    }

    fn role(&self) -> ConnectorRole {
        ConnectorRole::Capture
    }

    fn build(&self, data: &ConnectorBuildData) -> Result<ConnectorDescriptor, ConnectorBuildError> {
        let connector = DebeziumOracleSourceConnector::new(data)?;
        ConnectorDescriptor::from_parts(&data.names.capture, &connector, None, None)
    }
}
