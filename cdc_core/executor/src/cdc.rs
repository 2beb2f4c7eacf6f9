//! Change tracking readiness for sources that need CDC switched on explicitly.
//!
//! SQL Server only captures tables once CDC is enabled on the database and on
//! each table. The other engines decode their replication log natively and are
//! always reported ready.

use crate::ExecutorError;
use catalog::Catalog;
use common::types::{ConnectionConfig, ResolvedPipeline};
use serde::Serialize;
use shared_clients::introspect::helpers::escape_literal;
use shared_clients::{BoxedDbClient, DbClientError, DbClientFactory, DbEngineClient, QueryOptions};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

const DATABASE_STATE_SQL: &str =
    "SELECT is_cdc_enabled FROM sys.databases WHERE name = DB_NAME()";

pub const ENABLE_DATABASE_SQL: &str = "EXEC sys.sp_cdc_enable_db";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CdcReadiness {
    pub enabled: bool,
    /// Statements that would make the source ready; empty when it already is.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub remediation: Vec<String>,
}

impl CdcReadiness {
    pub fn ready() -> Self {
        Self {
            enabled: true,
            remediation: Vec::new(),
        }
    }
}

pub fn enable_table_sql(schema: &str, table: &str) -> String {
    format!(
        "EXEC sys.sp_cdc_enable_table @source_schema = N'{}', @source_name = N'{}', @role_name = NULL, @supports_net_changes = 1",
        escape_literal(schema),
        escape_literal(table)
    )
}

/// Statements that bring a source to full readiness: the database switch
/// first when it is off, then one statement per untracked table.
pub fn plan_remediation(schema: &str, database_enabled: bool, untracked: &[&str]) -> Vec<String> {
    let mut statements = Vec::with_capacity(untracked.len() + 1);
    if !database_enabled {
        statements.push(ENABLE_DATABASE_SQL.to_string());
    }
    statements.extend(untracked.iter().map(|table| enable_table_sql(schema, table)));
    statements
}

fn tables_state_sql(schema: &str, tables: &[&str]) -> String {
    let names = tables
        .iter()
        .map(|t| format!("N'{}'", escape_literal(t)))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT t.name AS name, t.is_tracked_by_cdc AS is_tracked_by_cdc FROM sys.tables t \
         WHERE SCHEMA_NAME(t.schema_id) = N'{}' AND t.name IN ({names})",
        escape_literal(schema)
    )
}

pub struct CdcReadinessService {
    catalog: Arc<dyn Catalog>,
    clients: Arc<dyn DbClientFactory>,
    query_retries: u32,
}

impl CdcReadinessService {
    pub fn new(catalog: Arc<dyn Catalog>, clients: Arc<dyn DbClientFactory>) -> Self {
        Self {
            catalog,
            clients,
            query_retries: shared_clients::DEFAULT_QUERY_RETRIES,
        }
    }

    pub fn with_query_retries(mut self, retries: u32) -> Self {
        self.query_retries = retries;
        self
    }

    pub async fn check(&self, pipeline_id: &str) -> Result<CdcReadiness, ExecutorError> {
        let pipeline = self.catalog.resolve_pipeline(pipeline_id)?;
        self.check_resolved(&pipeline).await
    }

    pub(crate) async fn check_resolved(
        &self,
        pipeline: &ResolvedPipeline,
    ) -> Result<CdcReadiness, ExecutorError> {
        let source = &pipeline.source;
        if !source.engine.needs_explicit_cdc() {
            debug!(pipeline_id = pipeline.id(), engine = %source.engine, "native log capture, no CDC switch needed");
            return Ok(CdcReadiness::ready());
        }

        let tables: Vec<&str> = pipeline
            .selected_source_tables()
            .map(|t| t.name.as_str())
            .collect();

        let mut client = self.clients.client(source);
        let result = self.inspect(&mut client, source, &tables).await;
        client.disconnect().await;

        let readiness = result.inspect_err(|e| {
            error!(pipeline_id = pipeline.id(), "failed to check CDC state: {e}");
        })?;
        info!(
            pipeline_id = pipeline.id(),
            enabled = readiness.enabled,
            pending = readiness.remediation.len(),
            "checked CDC readiness"
        );
        Ok(readiness)
    }

    async fn inspect(
        &self,
        client: &mut BoxedDbClient,
        source: &ConnectionConfig,
        tables: &[&str],
    ) -> Result<CdcReadiness, DbClientError> {
        let options = QueryOptions::default().with_retries(self.query_retries);
        let rows = client.query(DATABASE_STATE_SQL, &[], options).await?;
        let database_enabled = rows
            .first()
            .and_then(|row| row.get_bool("is_cdc_enabled"))
            .unwrap_or(false);

        let schema = source.schema_or_default();
        let untracked: Vec<&str> = if tables.is_empty() {
            Vec::new()
        } else {
            let rows = client
                .query(&tables_state_sql(&schema, tables), &[], options)
                .await?;
            let tracked: HashSet<String> = rows
                .iter()
                .filter(|row| row.get_bool("is_tracked_by_cdc").unwrap_or(false))
                .filter_map(|row| row.get_string("name"))
                .map(|name| name.to_lowercase())
                .collect();
            // sys.tables names compare under the default case-insensitive collation.
            tables
                .iter()
                .copied()
                .filter(|t| !tracked.contains(&t.to_lowercase()))
                .collect()
        };

        let remediation = plan_remediation(&schema, database_enabled, &untracked);
        Ok(CdcReadiness {
            enabled: remediation.is_empty(),
            remediation,
        })
    }

    /// Apply the remediation from a fresh [`check`](Self::check). Returns the
    /// statements that ran; none when the source was already ready.
    ///
    /// Stops at the first failing statement. Whatever succeeded before it stays
    /// applied and shows up in the next `check`.
    pub async fn enable(&self, pipeline_id: &str) -> Result<Vec<String>, ExecutorError> {
        let pipeline = self.catalog.resolve_pipeline(pipeline_id)?;
        let readiness = self.check_resolved(&pipeline).await?;
        if readiness.enabled {
            return Ok(Vec::new());
        }

        let mut client = self.clients.client(&pipeline.source);
        let mut applied = Vec::with_capacity(readiness.remediation.len());
        let mut failure = None;
        for statement in readiness.remediation {
            match client.execute(&statement, &[]).await {
                Ok(()) => applied.push(statement),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        client.disconnect().await;

        if let Some(e) = failure {
            error!(pipeline_id, applied = applied.len(), "failed to enable CDC: {e}");
            return Err(ExecutorError::cdc_enable(
                format!("failed to enable CDC for pipeline {pipeline_id}"),
                e,
            ));
        }
        info!(pipeline_id, statements = applied.len(), "enabled CDC");
        Ok(applied)
    }
}
