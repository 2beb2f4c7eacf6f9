use crate::types::connection::{ConnectionConfig, ConnectionId};
use crate::types::connector::ConnectorRole;
use crate::types::tables::TableSelection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub type PipelineId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Draft,
    Active,
    Paused,
    Stopped,
    Error,
    Deleted,
}

/// Operator tuning carried with a pipeline. Only the typed knobs are read by
/// the connector builders; everything else is passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insert_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_poll_records: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sink_tasks_max: Option<u32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: PipelineId,
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub status: PipelineStatus,
    pub source_connection: ConnectionId,
    pub target_connection: ConnectionId,
    #[serde(default)]
    pub source_tables: Vec<TableSelection>,
    #[serde(default)]
    pub target_tables: Vec<TableSelection>,
    #[serde(default)]
    pub settings: PipelineSettings,
    /// Ids of audit entries written for this pipeline, oldest first.
    #[serde(default)]
    pub audit_refs: Vec<String>,
    #[serde(default)]
    pub last_run_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_success_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Pipeline {
    pub fn is_deleted(&self) -> bool {
        self.status == PipelineStatus::Deleted
    }
}

/// Input for registering a pipeline: the connections are given by value and
/// resolved to stored identities by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPipeline {
    pub name: String,
    #[serde(default = "default_owner")]
    pub owner: String,
    pub source: ConnectionConfig,
    pub target: ConnectionConfig,
    #[serde(default)]
    pub source_tables: Vec<TableSelection>,
    #[serde(default)]
    pub target_tables: Vec<TableSelection>,
    #[serde(default)]
    pub settings: PipelineSettings,
}

fn default_owner() -> String {
    "system".to_string()
}

/// A pipeline with both of its connection configs populated.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPipeline {
    pub pipeline: Pipeline,
    pub source: ConnectionConfig,
    pub target: ConnectionConfig,
}

impl ResolvedPipeline {
    pub fn id(&self) -> &str {
        &self.pipeline.id
    }

    pub fn connection_for(&self, role: ConnectorRole) -> &ConnectionConfig {
        match role {
            ConnectorRole::Capture => &self.source,
            ConnectorRole::Apply => &self.target,
        }
    }

    pub fn selected_source_tables(&self) -> impl Iterator<Item = &TableSelection> {
        self.pipeline.source_tables.iter().filter(|t| t.selected)
    }

    pub fn selected_target_tables(&self) -> impl Iterator<Item = &TableSelection> {
        self.pipeline.target_tables.iter().filter(|t| t.selected)
    }
}
