//! Keeps `last_success_at` of every pipeline in step with the offset commits
//! its apply connector reports to the metrics backend.

use crate::ExecutorError;
use catalog::{Catalog, CatalogError};
use chrono::{DateTime, Utc};
use common::naming::parse_connector_name;
use common::types::ConnectorRole;
use parking_lot::Mutex;
use serde::Serialize;
use shared_clients::prometheus::MetricsSource;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LastSuccessUpdate {
    pub pipeline_id: String,
    pub connector_name: String,
    pub last_success_at: DateTime<Utc>,
}

pub struct LastSuccessMonitor {
    catalog: Arc<dyn Catalog>,
    metrics: Arc<dyn MetricsSource>,
    /// Commit time last seen per connector.
    seen: Mutex<HashMap<String, DateTime<Utc>>>,
}

impl LastSuccessMonitor {
    pub fn new(catalog: Arc<dyn Catalog>, metrics: Arc<dyn MetricsSource>) -> Self {
        Self {
            catalog,
            metrics,
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// One pass over every apply connector the metrics backend knows.
    ///
    /// Failing to list connectors fails the pass. A connector whose commit time
    /// cannot be read, or whose pipeline is not in the catalog, is logged and
    /// skipped.
    pub async fn update_all(&self) -> Result<Vec<LastSuccessUpdate>, ExecutorError> {
        let names = self.metrics.connector_names().await?;
        let mut updates = Vec::new();

        for name in names {
            let Some(parsed) = parse_connector_name(&name) else {
                continue;
            };
            if parsed.role != ConnectorRole::Apply {
                continue;
            }

            let latest = match self.metrics.last_commit_time(&name).await {
                Ok(Some(latest)) => latest,
                Ok(None) => continue,
                Err(err) => {
                    warn!(connector = %name, "could not read commit time: {err}");
                    continue;
                }
            };
            if self.seen.lock().get(&name) == Some(&latest) {
                continue;
            }

            match self.catalog.record_success_at(&parsed.pipeline_id, latest) {
                Ok(true) => {
                    info!(pipeline_id = %parsed.pipeline_id, connector = %name, %latest, "last success advanced");
                    updates.push(LastSuccessUpdate {
                        pipeline_id: parsed.pipeline_id,
                        connector_name: name.clone(),
                        last_success_at: latest,
                    });
                }
                Ok(false) => debug!(connector = %name, "last success already current"),
                Err(CatalogError::NotFound { .. }) => {
                    warn!(pipeline_id = %parsed.pipeline_id, connector = %name, "no pipeline for connector");
                }
                Err(err) => return Err(err.into()),
            }
            self.seen.lock().insert(name, latest);
        }
        Ok(updates)
    }
}
