use crate::kafka::connectors::base::ConverterSettings;
use crate::kafka::errors::{ConnectorBuildError, ErrorBag};
use crate::kafka::predicates::Predicates;
use crate::kafka::smt::{SmtChain, Transforms};
use crate::kafka::{ConnectorBuildData, ConnectorBuilder, ConnectorDescriptor, HasConnectorClass};
use common::naming::{topic_name, topic_strip_regex};
use common::types::{ConnectionConfig, ConnectorRole, EngineKind};
use serde::Serialize;

pub const CONNECTOR_CLASS_NAME: &str = "io.confluent.connect.jdbc.JdbcSinkConnector";
pub const DEFAULT_INSERT_MODE: &str = "upsert";
pub const INSERT_MODES: &[&str] = &["insert", "upsert", "update"];
pub const DEFAULT_BATCH_SIZE: u32 = 30_000;
pub const DEFAULT_MAX_POLL_RECORDS: u32 = 30_000;

pub fn jdbc_url(conn: &ConnectionConfig) -> String {
    let ConnectionConfig {
        host,
        port,
        database,
        ..
    } = conn;
    match conn.engine {
        EngineKind::Postgres => format!("jdbc:postgresql://{host}:{port}/{database}"),
        EngineKind::Mysql => format!("jdbc:mysql://{host}:{port}/{database}"),
        EngineKind::Mssql => format!("jdbc:sqlserver://{host}:{port};databaseName={database}"),
        EngineKind::Oracle => format!("jdbc:oracle:thin:@//{host}:{port}/{database}"),
    }
}

pub fn jdbc_driver(engine: EngineKind) -> &'static str {
    match engine {
        EngineKind::Postgres => "org.postgresql.Driver",
        EngineKind::Mysql => "com.mysql.cj.jdbc.Driver",
        EngineKind::Mssql => "com.microsoft.sqlserver.jdbc.SQLServerDriver",
        EngineKind::Oracle => "oracle.jdbc.OracleDriver",
    }
}

/// Table the sink writes each record to. After the rename chain the topic is
/// the bare target table name.
fn table_name_format(conn: &ConnectionConfig) -> String {
    match conn.engine {
        EngineKind::Mysql => "${topic}".to_string(),
        EngineKind::Postgres | EngineKind::Mssql | EngineKind::Oracle => {
            format!("{}.${{topic}}", conn.schema_or_default())
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct JdbcSinkConnector {
    #[serde(rename = "connector.class")]
    pub connector_class: String,
    #[serde(rename = "tasks.max")]
    tasks_max: u32,
    topics: String,

    #[serde(rename = "connection.url")]
    connection_url: String,
    #[serde(rename = "connection.user")]
    connection_user: String,
    #[serde(rename = "connection.password")]
    connection_password: String,
    #[serde(rename = "connection.driver")]
    connection_driver: String,

    #[serde(rename = "insert.mode")]
    insert_mode: String,
    #[serde(rename = "pk.mode")]
    pk_mode: String,
    #[serde(rename = "auto.create")]
    auto_create: bool,
    #[serde(rename = "auto.evolve")]
    auto_evolve: bool,
    #[serde(rename = "table.name.format")]
    table_name_format: String,
    #[serde(rename = "quote.sql.identifiers", skip_serializing_if = "Option::is_none")]
    quote_sql_identifiers: Option<String>,

    #[serde(rename = "max.retries")]
    max_retries: u32,
    #[serde(rename = "retry.backoff.ms")]
    retry_backoff_ms: u64,
    #[serde(rename = "batch.size")]
    batch_size: u32,
    #[serde(rename = "consumer.override.max.poll.records")]
    max_poll_records: u32,

    #[serde(flatten)]
    converters: ConverterSettings,
}

impl JdbcSinkConnector {
    pub fn new(data: &ConnectorBuildData) -> Result<Self, ConnectorBuildError> {
        let pipeline = &data.pipeline;
        let settings = &pipeline.pipeline.settings;
        let target = &pipeline.target;

        let mut bag = ErrorBag::default();
        bag.check_allowed("insert_mode", settings.insert_mode.as_deref(), INSERT_MODES);
        bag.check_positive("batch_size", settings.batch_size);
        bag.check_positive("max_poll_records", settings.max_poll_records);
        bag.check_positive("sink_tasks_max", settings.sink_tasks_max);
        bag.finish()?;

        let topics = data
            .selected_source_tables()?
            .iter()
            .map(|table| topic_name(&pipeline.source, &table.name))
            .collect::<Vec<_>>()
            .join(",");

        Ok(Self {
            connector_class: CONNECTOR_CLASS_NAME.to_string(),
            tasks_max: settings.sink_tasks_max.unwrap_or(1),
            topics,
            connection_url: jdbc_url(target),
            connection_user: target.username.clone(),
            connection_password: target.password.clone(),
            connection_driver: jdbc_driver(target.engine).to_string(),
            insert_mode: settings
                .insert_mode
                .clone()
                .unwrap_or_else(|| DEFAULT_INSERT_MODE.to_string()),
            pk_mode: "record_key".to_string(),
            auto_create: true,
            auto_evolve: true,
            table_name_format: table_name_format(target),
            // Oracle folds unquoted names to upper case, matching what auto.create made.
            quote_sql_identifiers: (target.engine == EngineKind::Oracle).then(|| "never".to_string()),
            max_retries: 5,
            retry_backoff_ms: 1000,
            batch_size: settings.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            max_poll_records: settings.max_poll_records.unwrap_or(DEFAULT_MAX_POLL_RECORDS),
            converters: ConverterSettings::default(),
        })
    }
}

impl HasConnectorClass for JdbcSinkConnector {
    fn connector_class(&self) -> &str {
        &self.connector_class
    }
}

/// Routing chain for the sink: strip the capture prefix, apply table renames,
/// rename fields per target table, then unwrap the change envelope.
pub fn rename_chain(data: &ConnectorBuildData) -> Result<(Transforms, Predicates), ConnectorBuildError> {
    let pipeline = &data.pipeline;
    let mut chain = SmtChain::new(topic_strip_regex(&pipeline.source));
    let renames = pipeline
        .selected_target_tables()
        .filter(|t| t.is_renamed())
        .map(|t| (t.source_name(), t.name.as_str()));
    for (from, to) in ordered_table_renames(renames.collect())? {
        chain.rename_table(from, to);
    }
    for table in pipeline.selected_target_tables() {
        chain.rename_fields(&table.name, table.effective_renames())?;
    }
    Ok(chain.finish())
}

/// Order renames so no step consumes another step's output: a rename whose
/// target is some other rename's source runs after that rename. Cycles such
/// as a swap cannot be expressed and are rejected.
fn ordered_table_renames<'a>(
    mut pending: Vec<(&'a str, &'a str)>,
) -> Result<Vec<(&'a str, &'a str)>, ConnectorBuildError> {
    let mut ordered = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let ready = pending
            .iter()
            .position(|(_, to)| !pending.iter().any(|(from, _)| from == to));
        let Some(index) = ready else {
            let cycle = pending
                .iter()
                .map(|(from, to)| format!("{from}->{to}"))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(ConnectorBuildError::config(format!(
                "table renames form a cycle: {cycle}"
            )));
        };
        ordered.push(pending.remove(index));
    }
    Ok(ordered)
}

/// One builder per target engine; the registry holds all four.
pub struct JdbcSinkBuilder {
    engine: EngineKind,
}

impl JdbcSinkBuilder {
    pub fn new(engine: EngineKind) -> Self {
        Self { engine }
    }
}

impl ConnectorBuilder for JdbcSinkBuilder {
    fn engine(&self) -> EngineKind {
        self.engine
    }

    fn role(&self) -> ConnectorRole {
        ConnectorRole::Apply
    }

    fn build(&self, data: &ConnectorBuildData) -> Result<ConnectorDescriptor, ConnectorBuildError> {
        let connector = JdbcSinkConnector::new(data)?;
        let (transforms, predicates) = rename_chain(data)?;
        ConnectorDescriptor::from_parts(
            &data.names.apply,
            &connector,
            Some(&transforms),
            Some(&predicates),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::KafkaSettings;
    use test_utils::fixtures::{mssql_source, orders_new_pipeline, resolve};

    #[test]
    fn urls_per_engine() {
        let mssql = mssql_source();
        assert_eq!(jdbc_url(&mssql), "jdbc:sqlserver://sql.internal:1433;databaseName=sales");
        let ora = ConnectionConfig::new(EngineKind::Oracle, "ora", 1521, "u", "p", "XEPDB1");
        assert_eq!(jdbc_url(&ora), "jdbc:oracle:thin:@//ora:1521/XEPDB1");
        assert_eq!(jdbc_driver(EngineKind::Mysql), "com.mysql.cj.jdbc.Driver");
    }

    #[test]
    fn oracle_target_disables_identifier_quoting() {
        let mut new = orders_new_pipeline();
        new.target = ConnectionConfig::new(EngineKind::Oracle, "ora", 1521, "app", "p", "XEPDB1");
        let data = ConnectorBuildData::new(resolve(new, "o1"), 1, KafkaSettings::default());
        let descriptor = JdbcSinkBuilder::new(EngineKind::Oracle).build(&data).unwrap();

        assert_eq!(descriptor.get("quote.sql.identifiers"), Some("never"));
        assert_eq!(descriptor.get("table.name.format"), Some("APP.${topic}"));
    }

    #[test]
    fn mysql_target_uses_bare_topic_as_table() {
        let mut new = orders_new_pipeline();
        new.target = ConnectionConfig::new(EngineKind::Mysql, "my", 3306, "u", "p", "dw");
        let data = ConnectorBuildData::new(resolve(new, "m1"), 1, KafkaSettings::default());
        let descriptor = JdbcSinkBuilder::new(EngineKind::Mysql).build(&data).unwrap();

        assert_eq!(descriptor.get("table.name.format"), Some("${topic}"));
        assert!(!descriptor.config.contains_key("quote.sql.identifiers"));
    }

    #[test]
    fn renames_run_before_their_target_is_consumed() {
        let ordered = ordered_table_renames(vec![("a", "b"), ("b", "c"), ("x", "y")]).unwrap();
        assert_eq!(ordered, vec![("b", "c"), ("a", "b"), ("x", "y")]);

        let err = ordered_table_renames(vec![("a", "b"), ("b", "a")]).unwrap_err();
        assert!(err.to_string().contains("a->b, b->a"));
    }

    #[test]
    fn rejects_unknown_insert_mode() {
        let mut new = orders_new_pipeline();
        new.settings.insert_mode = Some("merge".to_string());
        let data = ConnectorBuildData::new(resolve(new, "p1"), 1, KafkaSettings::default());

        let err = JdbcSinkBuilder::new(EngineKind::Postgres).build(&data).unwrap_err();
        assert!(err.to_string().contains("insert_mode has invalid value 'merge'"));
    }
}
