use crate::kafka::connectors::base::CaptureCommon;
use crate::kafka::errors::ConnectorBuildError;
use crate::kafka::{ConnectorBuildData, ConnectorBuilder, ConnectorDescriptor, HasConnectorClass};
use common::types::{ConnectorRole, EngineKind, TlsConfig};
use serde::Serialize;

pub const CONNECTOR_CLASS_NAME: &str = "io.debezium.connector.mysql.MySqlConnector";

#[derive(Serialize, Debug, Clone)]
pub struct DebeziumMysqlSourceConnector {
    #[serde(rename = "connector.class")]
    pub connector_class: String,

    #[serde(flatten)]
    pub common: CaptureCommon,

    /// Replication client id; must be unique across every client of the server.
    #[serde(rename = "database.server.id")]
    server_id: u64,
    #[serde(rename = "database.include.list")]
    database_include_list: String,
    #[serde(rename = "database.ssl.mode")]
    ssl_mode: String,
    #[serde(rename = "snapshot.locking.mode")]
    snapshot_locking_mode: String,
}

fn ssl_mode(tls: Option<&TlsConfig>) -> &'static str {
    match tls {
        None => "disabled",
        Some(tls) if tls.accept_invalid_certs || tls.ca_cert_path.is_none() => "required",
        Some(_) => "verify_ca",
    }
}

impl DebeziumMysqlSourceConnector {
    pub fn new(data: &ConnectorBuildData) -> Result<Self, ConnectorBuildError> {
        let conn = &data.pipeline.source;
        Ok(Self {
            connector_class: CONNECTOR_CLASS_NAME.to_string(),
            common: CaptureCommon::new(data)?,
            server_id: data.server_id,
            database_include_list: conn.database.clone(),
            ssl_mode: ssl_mode(conn.tls.as_ref()).to_string(),
            snapshot_locking_mode: "minimal".to_string(),
        })
    }
}

impl HasConnectorClass for DebeziumMysqlSourceConnector {
    fn connector_class(&self) -> &str {
        &self.connector_class
    }
}

pub struct MysqlCaptureBuilder;

impl ConnectorBuilder for MysqlCaptureBuilder {
    fn engine(&self) -> EngineKind {
        EngineKind::Mysql
    }

    fn role(&self) -> ConnectorRole {
        ConnectorRole::Capture
    }

    fn build(&self, data: &ConnectorBuildData) -> Result<ConnectorDescriptor, ConnectorBuildError> {
        let connector = DebeziumMysqlSourceConnector::new(data)?;
        ConnectorDescriptor::from_parts(&data.names.capture, &connector, None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::KafkaSettings;
    use serde_json::json;
    use test_utils::fixtures::orders_pipeline;

    #[test]
    fn mysql_capture_config() {
        let data = ConnectorBuildData::new(orders_pipeline(), 7, KafkaSettings::default());
        let descriptor = MysqlCaptureBuilder.build(&data).unwrap();

        assert_eq!(descriptor.name, "source.mysql_internal.shop.shop.p1");
        assert_eq!(descriptor.connector_class(), CONNECTOR_CLASS_NAME);
        assert_eq!(descriptor.get("table.include.list"), Some("shop.orders"));
        assert_eq!(descriptor.get("topic.prefix"), Some("mysql_internal"));
        assert_eq!(descriptor.config["database.server.id"], json!(7));
        assert_eq!(descriptor.get("database.ssl.mode"), Some("disabled"));
        assert_eq!(descriptor.config["value.converter.schemas.enable"], json!(true));
        assert!(!descriptor.config.contains_key("column.include.list"));
        assert!(!descriptor.config.contains_key("column.exclude.list"));
        let keys: Vec<&String> = descriptor.config.keys().collect();
        assert_eq!(keys[0], "connector.class");
    }
}
