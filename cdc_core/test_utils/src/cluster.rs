use async_trait::async_trait;
use parking_lot::Mutex;
use shared_clients::kafka::{
    ConnectorCluster, ConnectorState, ConnectorStatus, KafkaConnectClientError,
    KafkaConnectorDeployConfig,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

#[derive(Default)]
struct ClusterState {
    connectors: BTreeMap<String, ConnectorStatus>,
    configs: BTreeMap<String, KafkaConnectorDeployConfig>,
    failing: HashSet<String>,
    unreachable: bool,
    creates: usize,
    pauses: usize,
    resumes: usize,
    deletes: usize,
    status_calls: usize,
}

/// In-memory Connect cluster. Created connectors start `RUNNING` with one
/// running task; pause and resume flip the connector and task states.
#[derive(Clone, Default)]
pub struct FakeConnectorCluster {
    state: Arc<Mutex<ClusterState>>,
}

impl FakeConnectorCluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector as if it had been created out of band.
    pub fn with_connector(self, name: &str, state: ConnectorState) -> Self {
        self.set_state(name, state, vec![ConnectorState::Running]);
        self
    }

    pub fn set_state(&self, name: &str, state: ConnectorState, tasks: Vec<ConnectorState>) {
        self.state
            .lock()
            .connectors
            .insert(name.to_string(), ConnectorStatus::new(name, state, tasks));
    }

    pub fn remove(&self, name: &str) {
        self.state.lock().connectors.remove(name);
    }

    /// Every call naming `name` fails with an unexpected error.
    pub fn fail_for(&self, name: &str) {
        self.state.lock().failing.insert(name.to_string());
    }

    /// Every call fails as if the cluster could not be reached.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unreachable = unreachable;
    }

    pub fn state_of(&self, name: &str) -> Option<ConnectorState> {
        self.state
            .lock()
            .connectors
            .get(name)
            .map(|s| s.connector.state.clone())
    }

    pub fn config_of(&self, name: &str) -> Option<KafkaConnectorDeployConfig> {
        self.state.lock().configs.get(name).cloned()
    }

    pub fn connector_names(&self) -> Vec<String> {
        self.state.lock().connectors.keys().cloned().collect()
    }

    pub fn creates(&self) -> usize {
        self.state.lock().creates
    }

    pub fn pauses(&self) -> usize {
        self.state.lock().pauses
    }

    pub fn resumes(&self) -> usize {
        self.state.lock().resumes
    }

    pub fn deletes(&self) -> usize {
        self.state.lock().deletes
    }

    pub fn status_calls(&self) -> usize {
        self.state.lock().status_calls
    }

    fn check(state: &ClusterState, name: &str) -> Result<(), KafkaConnectClientError> {
        if state.unreachable {
            return Err(KafkaConnectClientError::failed_to_connect(
                "connect cluster unreachable",
            ));
        }
        if state.failing.contains(name) {
            return Err(KafkaConnectClientError::unexpected(format!(
                "scripted failure for {name}"
            )));
        }
        Ok(())
    }

    fn transition(&self, name: &str, to: ConnectorState) -> Result<(), KafkaConnectClientError> {
        let mut state = self.state.lock();
        Self::check(&state, name)?;
        let status = state
            .connectors
            .get_mut(name)
            .ok_or_else(|| KafkaConnectClientError::not_found(format!("connector {name}")))?;
        status.connector.state = to.clone();
        for task in &mut status.tasks {
            task.state = to.clone();
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectorCluster for FakeConnectorCluster {
    async fn create_connector(
        &self,
        cfg: &KafkaConnectorDeployConfig,
    ) -> Result<(), KafkaConnectClientError> {
        let mut state = self.state.lock();
        Self::check(&state, &cfg.name)?;
        if state.connectors.contains_key(&cfg.name) {
            return Err(KafkaConnectClientError::failed_to_deploy(format!(
                "Connector {} already exists",
                cfg.name
            )));
        }
        state.creates += 1;
        state.connectors.insert(
            cfg.name.clone(),
            ConnectorStatus::new(
                cfg.name.clone(),
                ConnectorState::Running,
                vec![ConnectorState::Running],
            ),
        );
        state.configs.insert(cfg.name.clone(), cfg.clone());
        Ok(())
    }

    async fn pause_connector(&self, name: &str) -> Result<(), KafkaConnectClientError> {
        self.transition(name, ConnectorState::Paused)?;
        self.state.lock().pauses += 1;
        Ok(())
    }

    async fn resume_connector(&self, name: &str) -> Result<(), KafkaConnectClientError> {
        self.transition(name, ConnectorState::Running)?;
        self.state.lock().resumes += 1;
        Ok(())
    }

    async fn connector_status(
        &self,
        name: &str,
    ) -> Result<Option<ConnectorStatus>, KafkaConnectClientError> {
        let mut state = self.state.lock();
        state.status_calls += 1;
        Self::check(&state, name)?;
        Ok(state.connectors.get(name).cloned())
    }

    async fn delete_connector(&self, name: &str) -> Result<(), KafkaConnectClientError> {
        let mut state = self.state.lock();
        Self::check(&state, name)?;
        if state.connectors.remove(name).is_none() {
            return Err(KafkaConnectClientError::not_found(format!(
                "connector {name} not found"
            )));
        }
        state.configs.remove(name);
        state.deletes += 1;
        Ok(())
    }
}
