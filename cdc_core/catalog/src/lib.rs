//! In-memory store for connections, pipelines and the connector audit trail.
//!
//! The catalog stands in for the document store the control plane runs
//! against. State is kept behind one lock and can be flushed to a JSON file.

pub mod error;

pub use crate::error::CatalogError;

use chrono::{DateTime, Utc};
use common::types::{
    ConnectionConfig, ConnectionId, ConnectorAuditLogEntry, ConnectorRole, NewPipeline, Pipeline,
    PipelineId, PipelineStatus, ResolvedPipeline,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// internal flat state (easy to serde)
#[derive(Default, Serialize, Deserialize)]
struct State {
    #[serde(default)]
    connections: HashMap<ConnectionId, ConnectionConfig>,
    #[serde(default)]
    pipelines: HashMap<PipelineId, Pipeline>,
    /// Append order is chronological.
    #[serde(default)]
    audit: Vec<ConnectorAuditLogEntry>,
    #[serde(default)]
    sequences: HashMap<String, u64>,
}

impl State {
    fn connection_id_for(&self, config: &ConnectionConfig) -> Option<ConnectionId> {
        let identity = config.identity();
        self.connections
            .iter()
            .find(|(_, existing)| existing.identity() == identity)
            .map(|(id, _)| id.clone())
    }

    fn pipeline_mut(&mut self, id: &str) -> Result<&mut Pipeline, CatalogError> {
        self.pipelines
            .get_mut(id)
            .ok_or_else(|| CatalogError::not_found(format!("pipeline {id} not found")))
    }
}

#[derive(Clone)]
pub struct MemoryCatalog {
    inner: Arc<RwLock<State>>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(State::default())),
        }
    }

    /* ---------- optional durability ---------- */

    /// A missing file yields an empty catalog.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let state = match std::fs::read_to_string(path) {
            Ok(json) => {
                serde_json::from_str(&json).map_err(|e| CatalogError::corrupt(path, e))?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => State::default(),
            Err(e) => return Err(CatalogError::storage("reading", path, e)),
        };
        Ok(Self {
            inner: Arc::new(RwLock::new(state)),
        })
    }

    /// Written to a sibling `.tmp` file, then renamed over `path`.
    pub fn flush_to(&self, path: impl AsRef<Path>) -> Result<(), CatalogError> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&*self.inner.read())
            .map_err(|e| CatalogError::corrupt(path, e))?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| CatalogError::storage("writing", &tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| CatalogError::storage("replacing", path, e))?;
        debug!(path = %path.display(), "catalog flushed");
        Ok(())
    }
}

pub trait Register: Send + Sync + 'static {
    /// Store `config` or, when a connection with the same identity exists,
    /// refresh its credentials and return the existing id.
    fn register_connection(&self, config: ConnectionConfig) -> ConnectionId;
    /// Fails with [`CatalogError::Duplicate`] when a live pipeline already
    /// connects the same source and target.
    fn register_pipeline(&self, new: NewPipeline) -> Result<Pipeline, CatalogError>;
    fn update_pipeline_status(&self, id: &str, status: PipelineStatus)
        -> Result<(), CatalogError>;
    /// Stamp a run. `error` of `None` also marks the run as the last success.
    fn record_run(&self, id: &str, error: Option<String>) -> Result<(), CatalogError>;
    /// Move `last_success_at` forward to `at`. Returns false when the stored
    /// value is already at or past it.
    fn record_success_at(&self, id: &str, at: DateTime<Utc>) -> Result<bool, CatalogError>;
    fn soft_delete_pipeline(&self, id: &str) -> Result<(), CatalogError>;
}

pub trait Getter: Send + Sync + 'static {
    fn get_pipeline(&self, id: &str) -> Result<Pipeline, CatalogError>;
    /// Deleted pipelines do not resolve.
    fn resolve_pipeline(&self, id: &str) -> Result<ResolvedPipeline, CatalogError>;
    fn get_connection(&self, id: &str) -> Result<ConnectionConfig, CatalogError>;
    /// Non-deleted pipelines, oldest first.
    fn list_pipelines(&self) -> Vec<Pipeline>;
}

pub trait AuditLog: Send + Sync + 'static {
    fn append_audit(&self, entry: ConnectorAuditLogEntry);
    /// Newest entry per role, capture first.
    fn latest_audit_by_pipeline(&self, pipeline_id: &str) -> Vec<ConnectorAuditLogEntry>;
    /// Every entry of the pipeline, newest first.
    fn audit_by_pipeline(&self, pipeline_id: &str) -> Vec<ConnectorAuditLogEntry>;
    /// Returns how many entries were removed.
    fn delete_audit_by_pipeline(&self, pipeline_id: &str) -> usize;
}

pub trait Sequences: Send + Sync + 'static {
    /// Monotonic per `name`, starting at 1.
    fn next_sequence(&self, name: &str) -> u64;
}

/// Everything the executor services need from a store.
pub trait Catalog: Register + Getter + AuditLog + Sequences {}

impl<T: Register + Getter + AuditLog + Sequences> Catalog for T {}

impl Register for MemoryCatalog {
    fn register_connection(&self, config: ConnectionConfig) -> ConnectionId {
        let mut g = self.inner.write();
        if let Some(id) = g.connection_id_for(&config) {
            if let Some(existing) = g.connections.get_mut(&id) {
                existing.username = config.username;
                existing.password = config.password;
                existing.tls = config.tls;
            }
            return id;
        }
        let id = Uuid::new_v4().to_string();
        g.connections.insert(id.clone(), config);
        id
    }

    fn register_pipeline(&self, new: NewPipeline) -> Result<Pipeline, CatalogError> {
        let source_id = self.register_connection(new.source);
        let target_id = self.register_connection(new.target);

        let mut g = self.inner.write();
        if let Some(existing) = g.pipelines.values().find(|p| {
            !p.is_deleted() && p.source_connection == source_id && p.target_connection == target_id
        }) {
            return Err(CatalogError::duplicate(format!(
                "pipeline {} already replicates between these connections",
                existing.id
            )));
        }

        let pipeline = Pipeline {
            id: Uuid::new_v4().to_string(),
            name: new.name,
            owner: new.owner,
            status: PipelineStatus::Draft,
            source_connection: source_id,
            target_connection: target_id,
            source_tables: new.source_tables,
            target_tables: new.target_tables,
            settings: new.settings,
            audit_refs: Vec::new(),
            last_run_at: None,
            last_success_at: None,
            last_error: None,
            created_at: Utc::now(),
        };
        g.pipelines.insert(pipeline.id.clone(), pipeline.clone());
        info!(pipeline_id = %pipeline.id, name = %pipeline.name, "registered pipeline");
        Ok(pipeline)
    }

    fn update_pipeline_status(
        &self,
        id: &str,
        status: PipelineStatus,
    ) -> Result<(), CatalogError> {
        self.inner.write().pipeline_mut(id)?.status = status;
        Ok(())
    }

    fn record_run(&self, id: &str, error: Option<String>) -> Result<(), CatalogError> {
        let mut g = self.inner.write();
        let pipeline = g.pipeline_mut(id)?;
        let now = Utc::now();
        pipeline.last_run_at = Some(now);
        match error {
            None => {
                pipeline.last_success_at = Some(now);
                pipeline.last_error = None;
            }
            Some(message) => pipeline.last_error = Some(message),
        }
        Ok(())
    }

    fn record_success_at(&self, id: &str, at: DateTime<Utc>) -> Result<bool, CatalogError> {
        let mut g = self.inner.write();
        let pipeline = g.pipeline_mut(id)?;
        if pipeline.last_success_at.is_some_and(|current| current >= at) {
            return Ok(false);
        }
        pipeline.last_success_at = Some(at);
        Ok(true)
    }

    fn soft_delete_pipeline(&self, id: &str) -> Result<(), CatalogError> {
        self.update_pipeline_status(id, PipelineStatus::Deleted)
    }
}

impl Getter for MemoryCatalog {
    fn get_pipeline(&self, id: &str) -> Result<Pipeline, CatalogError> {
        self.inner
            .read()
            .pipelines
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found(format!("pipeline {id} not found")))
    }

    fn resolve_pipeline(&self, id: &str) -> Result<ResolvedPipeline, CatalogError> {
        let pipeline = self.get_pipeline(id)?;
        if pipeline.is_deleted() {
            return Err(CatalogError::not_found(format!("pipeline {id} was deleted")));
        }
        let source = self.get_connection(&pipeline.source_connection)?;
        let target = self.get_connection(&pipeline.target_connection)?;
        Ok(ResolvedPipeline {
            pipeline,
            source,
            target,
        })
    }

    fn get_connection(&self, id: &str) -> Result<ConnectionConfig, CatalogError> {
        self.inner
            .read()
            .connections
            .get(id)
            .cloned()
            .ok_or_else(|| CatalogError::not_found(format!("connection {id} not found")))
    }

    fn list_pipelines(&self) -> Vec<Pipeline> {
        let mut pipelines: Vec<Pipeline> = self
            .inner
            .read()
            .pipelines
            .values()
            .filter(|p| !p.is_deleted())
            .cloned()
            .collect();
        pipelines.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        pipelines
    }
}

impl AuditLog for MemoryCatalog {
    fn append_audit(&self, entry: ConnectorAuditLogEntry) {
        let mut g = self.inner.write();
        if let Some(pipeline) = g.pipelines.get_mut(&entry.pipeline_id) {
            pipeline.audit_refs.push(entry.id.to_string());
        }
        g.audit.push(entry);
    }

    fn latest_audit_by_pipeline(&self, pipeline_id: &str) -> Vec<ConnectorAuditLogEntry> {
        let g = self.inner.read();
        ConnectorRole::BOTH
            .iter()
            .filter_map(|role| {
                g.audit
                    .iter()
                    .rev()
                    .find(|e| e.pipeline_id == pipeline_id && e.role == *role)
                    .cloned()
            })
            .collect()
    }

    fn audit_by_pipeline(&self, pipeline_id: &str) -> Vec<ConnectorAuditLogEntry> {
        self.inner
            .read()
            .audit
            .iter()
            .rev()
            .filter(|e| e.pipeline_id == pipeline_id)
            .cloned()
            .collect()
    }

    fn delete_audit_by_pipeline(&self, pipeline_id: &str) -> usize {
        let mut g = self.inner.write();
        let before = g.audit.len();
        g.audit.retain(|e| e.pipeline_id != pipeline_id);
        if let Some(pipeline) = g.pipelines.get_mut(pipeline_id) {
            pipeline.audit_refs.clear();
        }
        before - g.audit.len()
    }
}

impl Sequences for MemoryCatalog {
    fn next_sequence(&self, name: &str) -> u64 {
        let mut g = self.inner.write();
        let counter = g.sequences.entry(name.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::{AuditOutcome, ConnectorAction, EngineKind};
    use matches::assert_matches;
    use test_utils::fixtures::{mssql_new_pipeline, orders_new_pipeline};

    fn entry(pipeline: &str, role: ConnectorRole, message: &str) -> ConnectorAuditLogEntry {
        ConnectorAuditLogEntry::new(
            pipeline,
            format!("{role}.h.db.s.{pipeline}"),
            role,
            ConnectorAction::Start,
            AuditOutcome::Success,
            message,
            "system",
        )
    }

    #[test]
    fn same_identity_reuses_connection() {
        let catalog = MemoryCatalog::new();
        let a = ConnectionConfig::new(EngineKind::Mysql, "DB.internal", 3306, "u1", "p1", "shop");
        let b = ConnectionConfig::new(EngineKind::Mysql, "db.internal", 3306, "u2", "p2", "shop");
        let c = ConnectionConfig::new(EngineKind::Mysql, "db.internal", 3307, "u2", "p2", "shop");

        let id_a = catalog.register_connection(a);
        let id_b = catalog.register_connection(b);
        let id_c = catalog.register_connection(c);

        assert_eq!(id_a, id_b);
        assert_ne!(id_a, id_c);
        assert_eq!(catalog.get_connection(&id_a).unwrap().username, "u2");
    }

    #[test]
    fn second_pipeline_for_same_pair_is_rejected() {
        let catalog = MemoryCatalog::new();
        let first = catalog.register_pipeline(orders_new_pipeline()).unwrap();

        let err = catalog.register_pipeline(orders_new_pipeline()).unwrap_err();
        assert_matches!(err, CatalogError::Duplicate { .. });

        catalog.soft_delete_pipeline(&first.id).unwrap();
        let again = catalog.register_pipeline(orders_new_pipeline()).unwrap();
        assert_eq!(again.source_connection, first.source_connection);
        assert_eq!(catalog.list_pipelines().len(), 1);
    }

    #[test]
    fn deleted_pipelines_do_not_resolve() {
        let catalog = MemoryCatalog::new();
        let p = catalog.register_pipeline(orders_new_pipeline()).unwrap();
        let resolved = catalog.resolve_pipeline(&p.id).unwrap();
        assert_eq!(resolved.source.engine, EngineKind::Mysql);
        assert_eq!(resolved.target.database, "warehouse");

        catalog.soft_delete_pipeline(&p.id).unwrap();
        assert_matches!(
            catalog.resolve_pipeline(&p.id),
            Err(CatalogError::NotFound { .. })
        );
        assert_eq!(catalog.get_pipeline(&p.id).unwrap().status, PipelineStatus::Deleted);
    }

    #[test]
    fn success_time_only_moves_forward() {
        let catalog = MemoryCatalog::new();
        let p = catalog.register_pipeline(orders_new_pipeline()).unwrap();
        let earlier = Utc::now() - chrono::Duration::hours(2);
        let later = earlier + chrono::Duration::hours(1);

        assert!(catalog.record_success_at(&p.id, later).unwrap());
        assert!(!catalog.record_success_at(&p.id, earlier).unwrap());
        assert!(!catalog.record_success_at(&p.id, later).unwrap());
        assert_eq!(catalog.get_pipeline(&p.id).unwrap().last_success_at, Some(later));
        assert_matches!(
            catalog.record_success_at("missing", later),
            Err(CatalogError::NotFound { .. })
        );
    }

    #[test]
    fn record_run_tracks_success_and_error() {
        let catalog = MemoryCatalog::new();
        let p = catalog.register_pipeline(orders_new_pipeline()).unwrap();

        catalog.record_run(&p.id, Some("boom".into())).unwrap();
        let failed = catalog.get_pipeline(&p.id).unwrap();
        assert!(failed.last_run_at.is_some());
        assert!(failed.last_success_at.is_none());
        assert_eq!(failed.last_error.as_deref(), Some("boom"));

        catalog.record_run(&p.id, None).unwrap();
        let ok = catalog.get_pipeline(&p.id).unwrap();
        assert!(ok.last_success_at.is_some());
        assert!(ok.last_error.is_none());
    }

    #[test]
    fn latest_audit_is_per_role() {
        let catalog = MemoryCatalog::new();
        let p = catalog.register_pipeline(orders_new_pipeline()).unwrap();
        catalog.append_audit(entry(&p.id, ConnectorRole::Apply, "first sink"));
        catalog.append_audit(entry(&p.id, ConnectorRole::Capture, "first source"));
        catalog.append_audit(entry(&p.id, ConnectorRole::Apply, "second sink"));
        catalog.append_audit(entry("other", ConnectorRole::Capture, "unrelated"));

        let latest = catalog.latest_audit_by_pipeline(&p.id);
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].message, "first source");
        assert_eq!(latest[1].message, "second sink");

        let all = catalog.audit_by_pipeline(&p.id);
        assert_eq!(all[0].message, "second sink");
        assert_eq!(catalog.get_pipeline(&p.id).unwrap().audit_refs.len(), 3);

        assert_eq!(catalog.delete_audit_by_pipeline(&p.id), 3);
        assert!(catalog.audit_by_pipeline(&p.id).is_empty());
        assert_eq!(catalog.audit_by_pipeline("other").len(), 1);
    }

    #[test]
    fn sequences_are_monotonic_per_name() {
        let catalog = MemoryCatalog::new();
        assert_eq!(catalog.next_sequence("mysql_server_id"), 1);
        assert_eq!(catalog.next_sequence("mysql_server_id"), 2);
        assert_eq!(catalog.next_sequence("other"), 1);
    }

    #[test]
    fn flush_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let catalog = MemoryCatalog::new();
        let p = catalog.register_pipeline(mssql_new_pipeline()).unwrap();
        catalog.append_audit(entry(&p.id, ConnectorRole::Capture, "started"));
        catalog.next_sequence("mysql_server_id");
        catalog.flush_to(&path).unwrap();

        let loaded = MemoryCatalog::load_from(&path).unwrap();
        assert_eq!(loaded.get_pipeline(&p.id).unwrap(), catalog.get_pipeline(&p.id).unwrap());
        assert_eq!(loaded.audit_by_pipeline(&p.id).len(), 1);
        assert_eq!(loaded.next_sequence("mysql_server_id"), 2);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = MemoryCatalog::load_from(dir.path().join("absent.json")).unwrap();
        assert!(loaded.list_pipelines().is_empty());
    }

    #[test]
    fn garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        std::fs::write(&path, "not json").unwrap();
        let err = MemoryCatalog::load_from(&path).err().unwrap();
        assert_matches!(err, CatalogError::Corrupt { .. });
    }
}
