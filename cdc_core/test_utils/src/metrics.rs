use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use shared_clients::prometheus::{MetricsSource, PrometheusClientError};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
struct MetricsState {
    commits: BTreeMap<String, Option<DateTime<Utc>>>,
    failing: HashSet<String>,
    commit_queries: usize,
}

/// In-memory metrics backend. Connectors are listed in name order.
#[derive(Clone, Default)]
pub struct FakeMetrics {
    state: Arc<Mutex<MetricsState>>,
}

impl FakeMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `at` as the latest commit of `connector`; `None` lists the
    /// connector without any commit.
    pub fn set_commit(&self, connector: &str, at: Option<DateTime<Utc>>) {
        self.state.lock().commits.insert(connector.to_string(), at);
    }

    /// Commit lookups for `connector` fail.
    pub fn fail_for(&self, connector: &str) {
        self.state.lock().failing.insert(connector.to_string());
    }

    pub fn commit_queries(&self) -> usize {
        self.state.lock().commit_queries
    }
}

#[async_trait]
impl MetricsSource for FakeMetrics {
    async fn connector_names(&self) -> Result<Vec<String>, PrometheusClientError> {
        Ok(self.state.lock().commits.keys().cloned().collect())
    }

    async fn last_commit_time(
        &self,
        connector: &str,
    ) -> Result<Option<DateTime<Utc>>, PrometheusClientError> {
        let mut state = self.state.lock();
        state.commit_queries += 1;
        if state.failing.contains(connector) {
            return Err(PrometheusClientError::query_failed(format!(
                "scripted failure for {connector}"
            )));
        }
        Ok(state.commits.get(connector).copied().flatten())
    }
}
