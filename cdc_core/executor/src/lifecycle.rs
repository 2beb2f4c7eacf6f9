//! Desired-state control of the two connectors behind a pipeline.
//!
//! Decisions are taken against the live connector status on the cluster, never
//! against the audit log. The audit log only records what was attempted.

use crate::cdc::CdcReadinessService;
use crate::ExecutorError;
use catalog::Catalog;
use common::config::KafkaSettings;
use common::naming::ConnectorNames;
use common::types::{
    AuditOutcome, ConnectorAction, ConnectorAuditLogEntry, ConnectorRole, PipelineStatus,
    ResolvedPipeline, ToggleOutcome,
};
use components::{BuilderRegistry, ConnectorBuildData};
use serde::Serialize;
use shared_clients::kafka::{ConnectorCluster, KafkaConnectClientError, KafkaConnectorDeployConfig};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const DEFAULT_ACTOR: &str = "system";

/// Sequence the MySQL replication client ids are drawn from.
const SERVER_ID_SEQUENCE: &str = "server_id";
/// Keeps generated ids clear of the low values replicas usually take.
const SERVER_ID_BASE: u64 = 184_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineRunReport {
    pub pipeline_id: String,
    pub capture: ToggleOutcome,
    pub apply: ToggleOutcome,
}

pub struct ConnectorLifecycleController {
    catalog: Arc<dyn Catalog>,
    cluster: Arc<dyn ConnectorCluster>,
    cdc: Arc<CdcReadinessService>,
    registry: Arc<BuilderRegistry>,
    kafka: KafkaSettings,
    actor: String,
}

impl ConnectorLifecycleController {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        cluster: Arc<dyn ConnectorCluster>,
        cdc: Arc<CdcReadinessService>,
        registry: Arc<BuilderRegistry>,
        kafka: KafkaSettings,
    ) -> Self {
        Self {
            catalog,
            cluster,
            cdc,
            registry,
            kafka,
            actor: DEFAULT_ACTOR.to_string(),
        }
    }

    /// Name written as the actor of every audit entry.
    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = actor.into();
        self
    }

    /// Drive one connector of a pipeline towards `action`.
    ///
    /// Never fails: errors come back as [`ToggleOutcome::Error`] after a
    /// failed audit entry has been written.
    pub async fn toggle(
        &self,
        pipeline_id: &str,
        role: ConnectorRole,
        action: ConnectorAction,
    ) -> ToggleOutcome {
        let mut connector = None;
        match self
            .try_toggle(pipeline_id, role, action, &mut connector)
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                let connector = connector.unwrap_or_else(|| role.placeholder_name());
                let message = err.message();
                error!(pipeline_id, %connector, %role, %action, "toggle failed: {err}");
                self.audit(
                    pipeline_id,
                    &connector,
                    role,
                    action,
                    AuditOutcome::Failed,
                    &message,
                );
                ToggleOutcome::Error(message)
            }
        }
    }

    async fn try_toggle(
        &self,
        pipeline_id: &str,
        role: ConnectorRole,
        action: ConnectorAction,
        connector: &mut Option<String>,
    ) -> Result<ToggleOutcome, ExecutorError> {
        let pipeline = self.catalog.resolve_pipeline(pipeline_id)?;
        let name = ConnectorNames::for_pipeline(&pipeline).get(role).to_string();
        *connector = Some(name.clone());

        // A broken descriptor fails the toggle whatever the live state is.
        let data = self.build_data(pipeline, role);
        let descriptor = self.registry.build(role, &data)?;

        let status = self.cluster.connector_status(&name).await?;
        let outcome = match (action, status) {
            (ConnectorAction::Start, None) => {
                self.cluster
                    .create_connector(&KafkaConnectorDeployConfig {
                        name: descriptor.name.clone(),
                        config: descriptor.config_json(),
                    })
                    .await?;
                self.success(pipeline_id, &name, role, action, "Created and started connector");
                ToggleOutcome::Started
            }
            (ConnectorAction::Start, Some(status)) if status.is_running() => ToggleOutcome::Skipped,
            (ConnectorAction::Start, Some(status)) if status.is_paused() => {
                self.cluster.resume_connector(&name).await?;
                self.success(pipeline_id, &name, role, action, "Resumed existing connector");
                ToggleOutcome::Resumed
            }
            (ConnectorAction::Start, Some(status)) => {
                return Err(ExecutorError::connector_transition(format!(
                    "connector {name} is {}, cannot start it",
                    status.connector.state
                )));
            }
            (ConnectorAction::Pause, Some(status)) if status.is_running() => {
                self.cluster.pause_connector(&name).await?;
                self.success(pipeline_id, &name, role, action, "Paused connector");
                ToggleOutcome::Paused
            }
            (ConnectorAction::Pause, _) => ToggleOutcome::Skipped,
        };

        if outcome == ToggleOutcome::Skipped {
            debug!(pipeline_id, connector = %name, %action, "connector already in desired state");
        }
        Ok(outcome)
    }

    fn build_data(&self, pipeline: ResolvedPipeline, role: ConnectorRole) -> ConnectorBuildData {
        let server_id = match role {
            ConnectorRole::Capture => SERVER_ID_BASE + self.catalog.next_sequence(SERVER_ID_SEQUENCE),
            ConnectorRole::Apply => 0,
        };
        ConnectorBuildData::new(pipeline, server_id, self.kafka.clone())
    }

    fn success(
        &self,
        pipeline_id: &str,
        connector: &str,
        role: ConnectorRole,
        action: ConnectorAction,
        message: &str,
    ) {
        info!(pipeline_id, connector, %role, %action, "{message}");
        self.audit(pipeline_id, connector, role, action, AuditOutcome::Success, message);
    }

    fn audit(
        &self,
        pipeline_id: &str,
        connector: &str,
        role: ConnectorRole,
        action: ConnectorAction,
        outcome: AuditOutcome,
        message: &str,
    ) {
        self.catalog.append_audit(ConnectorAuditLogEntry::new(
            pipeline_id,
            connector,
            role,
            action,
            outcome,
            message,
            self.actor.as_str(),
        ));
    }

    /// Start both connectors, capture first.
    ///
    /// Sources that need change tracking switched on explicitly must report
    /// ready first; otherwise this fails with [`ExecutorError::CdcNotEnabled`]
    /// carrying the statements that would fix it.
    pub async fn build(&self, pipeline_id: &str) -> Result<PipelineRunReport, ExecutorError> {
        let pipeline = self.catalog.resolve_pipeline(pipeline_id)?;
        if pipeline.source.engine.needs_explicit_cdc() {
            let readiness = self.cdc.check_resolved(&pipeline).await?;
            if !readiness.enabled {
                warn!(
                    pipeline_id,
                    pending = readiness.remediation.len(),
                    "refusing to build, CDC is not enabled on the source"
                );
                let err = ExecutorError::cdc_not_enabled(
                    format!("CDC is not enabled on the source of pipeline {pipeline_id}"),
                    readiness.remediation,
                );
                self.catalog.record_run(pipeline_id, Some(err.message()))?;
                return Err(err);
            }
        }

        let report = self
            .drive_both(pipeline_id, ConnectorAction::Start)
            .await?;
        self.catalog
            .update_pipeline_status(pipeline_id, PipelineStatus::Active)?;
        self.catalog.record_run(pipeline_id, None)?;
        info!(pipeline_id, "pipeline built");
        Ok(report)
    }

    /// Pause both connectors. Change tracking is not consulted.
    pub async fn pause(&self, pipeline_id: &str) -> Result<PipelineRunReport, ExecutorError> {
        self.catalog.resolve_pipeline(pipeline_id)?;
        let report = self
            .drive_both(pipeline_id, ConnectorAction::Pause)
            .await?;
        self.catalog
            .update_pipeline_status(pipeline_id, PipelineStatus::Paused)?;
        info!(pipeline_id, "pipeline paused");
        Ok(report)
    }

    async fn drive_both(
        &self,
        pipeline_id: &str,
        action: ConnectorAction,
    ) -> Result<PipelineRunReport, ExecutorError> {
        let capture = self.toggle(pipeline_id, ConnectorRole::Capture, action).await;
        if let ToggleOutcome::Error(message) = &capture {
            return Err(self.fail(pipeline_id, ConnectorRole::Capture, message));
        }
        let apply = self.toggle(pipeline_id, ConnectorRole::Apply, action).await;
        if let ToggleOutcome::Error(message) = &apply {
            return Err(self.fail(pipeline_id, ConnectorRole::Apply, message));
        }
        Ok(PipelineRunReport {
            pipeline_id: pipeline_id.to_string(),
            capture,
            apply,
        })
    }

    fn fail(&self, pipeline_id: &str, role: ConnectorRole, message: &str) -> ExecutorError {
        let message = format!("{role} connector of pipeline {pipeline_id}: {message}");
        if let Err(err) = self
            .catalog
            .update_pipeline_status(pipeline_id, PipelineStatus::Error)
            .and_then(|_| self.catalog.record_run(pipeline_id, Some(message.clone())))
        {
            warn!(pipeline_id, "could not record failed run: {err}");
        }
        ExecutorError::connector_transition(message)
    }

    /// Remove both connectors from the cluster, drop the pipeline's audit
    /// entries and soft-delete it. Connectors the cluster no longer knows are
    /// skipped. Returns the names actually removed.
    pub async fn delete(&self, pipeline_id: &str) -> Result<Vec<String>, ExecutorError> {
        let pipeline = self.catalog.resolve_pipeline(pipeline_id)?;
        let names = ConnectorNames::for_pipeline(&pipeline);

        let mut removed = Vec::new();
        for role in ConnectorRole::BOTH {
            let name = names.get(role);
            match self.cluster.delete_connector(name).await {
                Ok(()) => {
                    info!(pipeline_id, connector = name, "deleted connector");
                    removed.push(name.to_string());
                }
                Err(KafkaConnectClientError::NotFound { .. }) => {
                    debug!(pipeline_id, connector = name, "connector already absent");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let dropped = self.catalog.delete_audit_by_pipeline(pipeline_id);
        self.catalog.soft_delete_pipeline(pipeline_id)?;
        info!(pipeline_id, audit_entries = dropped, "pipeline deleted");
        Ok(removed)
    }
}
