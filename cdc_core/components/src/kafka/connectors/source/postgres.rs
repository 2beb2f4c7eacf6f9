use crate::kafka::connectors::base::CaptureCommon;
use crate::kafka::errors::ConnectorBuildError;
use crate::kafka::helpers::slot_safe;
use crate::kafka::{ConnectorBuildData, ConnectorBuilder, ConnectorDescriptor, HasConnectorClass};
use common::types::{ConnectorRole, EngineKind, TlsConfig};
use serde::Serialize;

pub const CONNECTOR_CLASS_NAME: &str = "io.debezium.connector.postgresql.PostgresConnector";

#[derive(Serialize, Debug, Clone)]
pub struct DebeziumPostgresSourceConnector {
    #[serde(rename = "connector.class")]
    pub connector_class: String,

    #[serde(flatten)]
    pub common: CaptureCommon,

    #[serde(rename = "plugin.name")]
    plugin_name: String,
    #[serde(rename = "database.dbname")]
    dbname: String,
    #[serde(rename = "database.sslmode")]
    sslmode: String,
    #[serde(rename = "schema.include.list")]
    schema_include_list: String,
    /// Logical replication slot; one per pipeline.
    #[serde(rename = "slot.name")]
    slot_name: String,
    #[serde(rename = "publication.name")]
    publication_name: String,
    #[serde(rename = "publication.autocreate.mode")]
    publication_autocreate_mode: String,
}

fn sslmode(tls: Option<&TlsConfig>) -> &'static str {
    match tls {
        None => "disable",
        Some(tls) if tls.accept_invalid_certs || tls.ca_cert_path.is_none() => "require",
        Some(_) => "verify-ca",
    }
}

impl DebeziumPostgresSourceConnector {
    pub fn new(data: &ConnectorBuildData) -> Result<Self, ConnectorBuildError> {
        let conn = &data.pipeline.source;
        let suffix = format!("{}_{}", slot_safe(&conn.database), slot_safe(data.pipeline.id()));
        Ok(Self {
            connector_class: CONNECTOR_CLASS_NAME.to_string(),
            common: CaptureCommon::new(data)?,
            plugin_name: "pgoutput".to_string(),
            dbname: conn.database.clone(),
            sslmode: sslmode(conn.tls.as_ref()).to_string(),
            schema_include_list: conn.schema_or_default(),
            slot_name: format!("slot_{suffix}"),
            publication_name: format!("pub_{suffix}"),
            publication_autocreate_mode: "filtered".to_string(),
        })
    }
}

impl HasConnectorClass for DebeziumPostgresSourceConnector {
    fn connector_class(&self) -> &str {
        &self.connector_class
    }
}

pub struct PostgresCaptureBuilder;

impl ConnectorBuilder for PostgresCaptureBuilder {
    fn engine(&self) -> EngineKind {
        EngineKind::Postgres
    }

    fn role(&self) -> ConnectorRole {
        ConnectorRole::Capture
    }

    fn build(&self, data: &ConnectorBuildData) -> Result<ConnectorDescriptor, ConnectorBuildError> {
        let connector = DebeziumPostgresSourceConnector::new(data)?;
        ConnectorDescriptor::from_parts(&data.names.capture, &connector, None, None)
    }
}
