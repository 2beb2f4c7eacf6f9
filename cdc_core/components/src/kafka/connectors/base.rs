use crate::kafka::errors::{ConnectorBuildError, ErrorBag};
use crate::kafka::helpers::{slot_safe, table_include_list, table_qualifier, ColumnFilter};
use crate::kafka::ConnectorBuildData;
use common::naming::capture_topic_prefix;
use serde::Serialize;

pub const DEFAULT_SNAPSHOT_MODE: &str = "initial";
pub const DEFAULT_SNAPSHOT_FETCH_SIZE: u32 = 30_000;
pub const SNAPSHOT_MODES: &[&str] = &[
    "initial",
    "initial_only",
    "no_data",
    "never",
    "when_needed",
    "always",
];

/// Converter flags shared by both roles. Schemas stay enabled so the unwrap
/// step and the JDBC sink can see column types.
#[derive(Serialize, Debug, Clone)]
pub struct ConverterSettings {
    #[serde(rename = "key.converter.schemas.enable")]
    pub key_schemas_enable: bool,
    #[serde(rename = "value.converter.schemas.enable")]
    pub value_schemas_enable: bool,
}

impl Default for ConverterSettings {
    fn default() -> Self {
        Self {
            key_schemas_enable: true,
            value_schemas_enable: true,
        }
    }
}

/// Keys every Debezium capture connector takes in the same shape.
/// Flatten this into the per-engine source structs.
#[derive(Serialize, Debug, Clone)]
pub struct CaptureCommon {
    #[serde(rename = "tasks.max")]
    pub tasks_max: u32,

    #[serde(rename = "database.hostname")]
    pub hostname: String,
    #[serde(rename = "database.port")]
    pub port: u16,
    #[serde(rename = "database.user")]
    pub user: String,
    #[serde(rename = "database.password")]
    pub password: String,

    #[serde(rename = "topic.prefix")]
    pub topic_prefix: String,
    #[serde(rename = "table.include.list")]
    pub table_include_list: String,
    #[serde(rename = "column.include.list", skip_serializing_if = "Option::is_none")]
    pub column_include_list: Option<String>,
    #[serde(rename = "column.exclude.list", skip_serializing_if = "Option::is_none")]
    pub column_exclude_list: Option<String>,

    #[serde(rename = "schema.history.internal.kafka.bootstrap.servers")]
    pub schema_history_bootstrap_servers: String,
    #[serde(rename = "schema.history.internal.kafka.topic")]
    pub schema_history_topic: String,

    #[serde(rename = "snapshot.mode")]
    pub snapshot_mode: String,
    #[serde(rename = "snapshot.fetch.size")]
    pub snapshot_fetch_size: u32,

    #[serde(rename = "datatype.propagate.source.type")]
    pub datatype_propagate_source_type: String,
    #[serde(rename = "time.precision.mode")]
    pub time_precision_mode: String,
    #[serde(rename = "decimal.handling.mode")]
    pub decimal_handling_mode: String,

    #[serde(flatten)]
    pub converters: ConverterSettings,
}

impl CaptureCommon {
    pub fn new(data: &ConnectorBuildData) -> Result<Self, ConnectorBuildError> {
        let tables = data.selected_source_tables()?;
        let conn = &data.pipeline.source;
        let settings = &data.pipeline.pipeline.settings;

        let mut bag = ErrorBag::default();
        bag.check_allowed(
            "replication_mode",
            settings.replication_mode.as_deref(),
            SNAPSHOT_MODES,
        );
        bag.check_positive("batch_size", settings.batch_size);
        bag.finish()?;

        let qualifier = table_qualifier(conn);
        if let Some(table) = tables
            .iter()
            .find(|t| !t.columns.is_empty() && t.columns.iter().all(|c| !c.included))
        {
            return Err(ConnectorBuildError::missing_config(format!(
                "table {qualifier}.{} has no included columns",
                table.name
            )));
        }
        let columns = ColumnFilter::for_tables(&qualifier, tables.iter().copied());

        Ok(Self {
            tasks_max: 1,
            hostname: conn.host.clone(),
            port: conn.port,
            user: conn.username.clone(),
            password: conn.password.clone(),
            topic_prefix: capture_topic_prefix(conn),
            table_include_list: table_include_list(&qualifier, tables.iter().copied()),
            column_include_list: columns.include_list(),
            column_exclude_list: columns.exclude_list(),
            schema_history_bootstrap_servers: data.kafka.bootstrap_servers.clone(),
            schema_history_topic: format!(
                "schema_history.{}.{}",
                slot_safe(&conn.database),
                data.pipeline.id()
            ),
            snapshot_mode: settings
                .replication_mode
                .clone()
                .unwrap_or_else(|| DEFAULT_SNAPSHOT_MODE.to_string()),
            snapshot_fetch_size: settings.batch_size.unwrap_or(DEFAULT_SNAPSHOT_FETCH_SIZE),
            datatype_propagate_source_type: ".+".to_string(),
            time_precision_mode: "connect".to_string(),
            decimal_handling_mode: "double".to_string(),
            converters: ConverterSettings::default(),
        })
    }
}
