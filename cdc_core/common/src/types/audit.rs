use crate::types::connector::{ConnectorAction, ConnectorRole};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    Success,
    Failed,
}

/// One append-only record of a lifecycle mutation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorAuditLogEntry {
    pub id: Uuid,
    pub pipeline_id: String,
    pub connector_name: String,
    pub role: ConnectorRole,
    pub action: ConnectorAction,
    pub outcome: AuditOutcome,
    pub message: String,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

impl ConnectorAuditLogEntry {
    pub fn new(
        pipeline_id: impl Into<String>,
        connector_name: impl Into<String>,
        role: ConnectorRole,
        action: ConnectorAction,
        outcome: AuditOutcome,
        message: impl Into<String>,
        actor: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            pipeline_id: pipeline_id.into(),
            connector_name: connector_name.into(),
            role,
            action,
            outcome,
            message: message.into(),
            actor: actor.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.outcome == AuditOutcome::Failed
    }
}
