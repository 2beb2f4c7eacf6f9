//! Deterministic names shared by the connector builders, the lifecycle
//! controller and the status stream.
//!
//! A connector name is `<role>.<host>.<database>.<schema>.<pipelineId>` with dots
//! inside each part replaced by underscores, so the same pipeline always maps to
//! the same two connectors and the pipeline id can be read back from the name.
//! Topic names follow the layout the capture connector of each engine produces;
//! [`topic_strip_regex`] is always the inverse of [`topic_name`].

use crate::types::{ConnectionConfig, ConnectorRole, EngineKind, ResolvedPipeline};
use serde::{Deserialize, Serialize};

pub fn sanitize_part(part: &str) -> String {
    part.trim().replace('.', "_")
}

/// Host with dots replaced, used as the capture side topic prefix.
pub fn topic_prefix(conn: &ConnectionConfig) -> String {
    sanitize_part(&conn.host)
}

pub fn connector_name(role: ConnectorRole, conn: &ConnectionConfig, pipeline_id: &str) -> String {
    format!(
        "{}.{}.{}.{}.{}",
        role.as_str(),
        sanitize_part(&conn.host),
        sanitize_part(&conn.database),
        sanitize_part(&conn.schema_or_default()),
        pipeline_id
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectorNames {
    pub capture: String,
    pub apply: String,
}

impl ConnectorNames {
    pub fn for_pipeline(pipeline: &ResolvedPipeline) -> Self {
        Self {
            capture: connector_name(ConnectorRole::Capture, &pipeline.source, pipeline.id()),
            apply: connector_name(ConnectorRole::Apply, &pipeline.target, pipeline.id()),
        }
    }

    pub fn get(&self, role: ConnectorRole) -> &str {
        match role {
            ConnectorRole::Capture => &self.capture,
            ConnectorRole::Apply => &self.apply,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedConnectorName {
    pub role: ConnectorRole,
    pub pipeline_id: String,
}

/// Inverse of [`connector_name`]. Returns `None` for names this system did not produce.
pub fn parse_connector_name(name: &str) -> Option<ParsedConnectorName> {
    let parts: Vec<&str> = name.splitn(5, '.').collect();
    if parts.len() != 5 || parts[4].is_empty() {
        return None;
    }
    let role = parts[0].parse::<ConnectorRole>().ok()?;
    Some(ParsedConnectorName {
        role,
        pipeline_id: parts[4].to_string(),
    })
}

/// Value for the capture connector's `topic.prefix`.
///
/// Postgres topics are `<prefix>.<schema>.<table>`; folding the database into
/// the prefix gives them the same four-part layout SQL Server produces.
pub fn capture_topic_prefix(conn: &ConnectionConfig) -> String {
    match conn.engine {
        EngineKind::Postgres => format!("{}.{}", topic_prefix(conn), conn.database),
        EngineKind::Mysql | EngineKind::Mssql | EngineKind::Oracle => topic_prefix(conn),
    }
}

/// Schema as the capture connector spells it in topics and include lists.
///
/// Oracle reports owners upper-cased unless they were created quoted, so a
/// double-quoted schema keeps its case and anything else is folded.
pub fn capture_schema(conn: &ConnectionConfig) -> String {
    let schema = conn.schema_or_default();
    match conn.engine {
        EngineKind::Oracle => match schema.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            Some(quoted) => quoted.to_string(),
            None => schema.to_ascii_uppercase(),
        },
        EngineKind::Postgres | EngineKind::Mssql | EngineKind::Mysql => schema,
    }
}

fn topic_segments(conn: &ConnectionConfig) -> Vec<String> {
    match conn.engine {
        EngineKind::Mssql | EngineKind::Postgres => vec![
            topic_prefix(conn),
            conn.database.clone(),
            conn.schema_or_default(),
        ],
        EngineKind::Mysql => vec![topic_prefix(conn), conn.database.clone()],
        EngineKind::Oracle => vec![topic_prefix(conn), capture_schema(conn)],
    }
}

/// Topic the capture connector of `conn` publishes changes of `table` to.
pub fn topic_name(conn: &ConnectionConfig, table: &str) -> String {
    let mut segments = topic_segments(conn);
    segments.push(table.to_string());
    segments.join(".")
}

/// Regex that reduces any topic of `conn` to the bare table name in group 1.
pub fn topic_strip_regex(conn: &ConnectionConfig) -> String {
    let prefix = topic_segments(conn)
        .iter()
        .map(|s| regex::escape(s))
        .collect::<Vec<_>>()
        .join(r"\.");
    format!(r"^{prefix}\.(.*)$")
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn conn(engine: EngineKind) -> ConnectionConfig {
        ConnectionConfig::new(engine, "10.0.0.5", engine.default_port(), "app", "pw", "shop")
    }

    #[test]
    fn connector_name_is_deterministic_and_sanitized() {
        let c = conn(EngineKind::Mssql);
        let name = connector_name(ConnectorRole::Capture, &c, "p-1");
        assert_eq!(name, "source.10_0_0_5.shop.dbo.p-1");
        assert_eq!(name, connector_name(ConnectorRole::Capture, &c, "p-1"));
    }

    #[test]
    fn parse_recovers_role_and_pipeline() {
        let c = conn(EngineKind::Postgres);
        let name = connector_name(ConnectorRole::Apply, &c, "66a1f0c2");
        let parsed = parse_connector_name(&name).unwrap();
        assert_eq!(parsed.role, ConnectorRole::Apply);
        assert_eq!(parsed.pipeline_id, "66a1f0c2");
        assert!(parse_connector_name("random-connector").is_none());
    }

    #[test]
    fn strip_regex_inverts_topic_name_for_every_engine() {
        for engine in EngineKind::ALL {
            let c = conn(engine);
            let topic = topic_name(&c, "orders");
            let re = Regex::new(&topic_strip_regex(&c)).unwrap();
            let caps = re.captures(&topic).unwrap();
            assert_eq!(&caps[1], "orders", "engine {engine}");
        }
    }

    #[test]
    fn mssql_topic_layout() {
        let c = conn(EngineKind::Mssql);
        assert_eq!(topic_name(&c, "orders"), "10_0_0_5.shop.dbo.orders");
        assert_eq!(topic_strip_regex(&c), r"^10_0_0_5\.shop\.dbo\.(.*)$");
    }

    #[test]
    fn oracle_topics_use_the_upper_cased_owner() {
        let c = conn(EngineKind::Oracle).with_schema("sales");
        assert_eq!(topic_name(&c, "ORDERS"), "10_0_0_5.SALES.ORDERS");
        assert_eq!(topic_strip_regex(&c), r"^10_0_0_5\.SALES\.(.*)$");

        let quoted = conn(EngineKind::Oracle).with_schema("\"MixedOwner\"");
        assert_eq!(topic_name(&quoted, "ORDERS"), "10_0_0_5.MixedOwner.ORDERS");
    }

    #[test]
    fn postgres_prefix_folds_database() {
        let c = conn(EngineKind::Postgres);
        assert_eq!(capture_topic_prefix(&c), "10_0_0_5.shop");
        assert_eq!(topic_name(&c, "orders"), "10_0_0_5.shop.public.orders");
    }
}
