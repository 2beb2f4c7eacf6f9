use async_trait::async_trait;
use common::error::diagnostics::DiagnosticMessage;
use common::types::SummaryStatus;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Body of `POST /connectors`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KafkaConnectorDeployConfig {
    pub name: String,
    pub config: Value,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct KafkaConnectorDeployedConfig {
    pub name: String,
    pub config: Value,
    #[serde(rename = "type")]
    pub conn_type: Option<String>,
}

#[derive(Debug, Error)]
pub enum KafkaConnectClientError {
    #[error("connector not found: {context}")]
    NotFound { context: DiagnosticMessage },
    #[error("connectivity error: {context}")]
    FailedToConnect { context: DiagnosticMessage },
    #[error("deployment failed: {context}")]
    FailedToDeploy { context: DiagnosticMessage },
    #[error("unexpected response: {context}")]
    UnexpectedError { context: DiagnosticMessage },
}

impl KafkaConnectClientError {
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn failed_to_connect(message: impl Into<String>) -> Self {
        Self::FailedToConnect {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn failed_to_deploy(message: impl Into<String>) -> Self {
        Self::FailedToDeploy {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::UnexpectedError {
            context: DiagnosticMessage::new(message.into()),
        }
    }
}

#[derive(Deserialize)]
struct ConnectErrorBody {
    message: String,
}

impl From<reqwest::Error> for KafkaConnectClientError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            KafkaConnectClientError::failed_to_connect(err.to_string())
        } else if let Some(status) = err.status() {
            match status {
                StatusCode::BAD_REQUEST => KafkaConnectClientError::failed_to_deploy(err.to_string()),
                StatusCode::NOT_FOUND => KafkaConnectClientError::not_found(err.to_string()),
                _ => KafkaConnectClientError::unexpected(format!(
                    "Unexpected error due to {} - status code {}",
                    err, status
                )),
            }
        } else {
            KafkaConnectClientError::unexpected(format!(
                "Unexpected error trying to send kafka connect request: {}",
                err
            ))
        }
    }
}

/* ---------- Runtime status ---------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectorState {
    Running,
    Paused,
    Failed,
    Unassigned,
    Restarting,
    #[serde(other)]
    Other,
}

impl fmt::Display for ConnectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectorState::Running => "RUNNING",
            ConnectorState::Paused => "PAUSED",
            ConnectorState::Failed => "FAILED",
            ConnectorState::Unassigned => "UNASSIGNED",
            ConnectorState::Restarting => "RESTARTING",
            ConnectorState::Other => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorStateInfo {
    pub state: ConnectorState,
    #[serde(default)]
    pub worker_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskState {
    pub id: u32,
    pub state: ConnectorState,
    #[serde(default)]
    pub worker_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<String>,
}

/// Body of `GET /connectors/{name}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorStatus {
    pub name: String,
    pub connector: ConnectorStateInfo,
    #[serde(default)]
    pub tasks: Vec<TaskState>,
}

impl ConnectorStatus {
    pub fn new(name: impl Into<String>, state: ConnectorState, tasks: Vec<ConnectorState>) -> Self {
        Self {
            name: name.into(),
            connector: ConnectorStateInfo {
                state,
                worker_id: None,
            },
            tasks: tasks
                .into_iter()
                .enumerate()
                .map(|(id, state)| TaskState {
                    id: id as u32,
                    state,
                    worker_id: None,
                    trace: None,
                })
                .collect(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.connector.state == ConnectorState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.connector.state == ConnectorState::Paused
    }

    pub fn summary(&self) -> SummaryStatus {
        summarize(self)
    }
}

/// Collapse connector and task states into one human-level status.
pub fn summarize(status: &ConnectorStatus) -> SummaryStatus {
    match status.connector.state {
        ConnectorState::Failed => SummaryStatus::Failed,
        ConnectorState::Paused => SummaryStatus::Paused,
        ConnectorState::Unassigned => SummaryStatus::Unassigned,
        ConnectorState::Running => {
            let total = status.tasks.len();
            let running = status
                .tasks
                .iter()
                .filter(|t| t.state == ConnectorState::Running)
                .count();
            let failed = status
                .tasks
                .iter()
                .filter(|t| t.state == ConnectorState::Failed)
                .count();

            if total == running {
                SummaryStatus::Running
            } else if failed == total {
                SummaryStatus::Failed
            } else if failed > 0 && running > 0 {
                SummaryStatus::PartiallyFailed
            } else {
                SummaryStatus::RunningWithWarnings
            }
        }
        ConnectorState::Restarting | ConnectorState::Other => SummaryStatus::Undefined,
    }
}

/* ---------- Cluster abstraction ---------- */

/// The remote calls the control plane makes against a Connect cluster.
#[async_trait]
pub trait ConnectorCluster: Send + Sync {
    async fn create_connector(
        &self,
        cfg: &KafkaConnectorDeployConfig,
    ) -> Result<(), KafkaConnectClientError>;

    async fn pause_connector(&self, name: &str) -> Result<(), KafkaConnectClientError>;

    async fn resume_connector(&self, name: &str) -> Result<(), KafkaConnectClientError>;

    /// `Ok(None)` when the cluster does not know the connector.
    async fn connector_status(
        &self,
        name: &str,
    ) -> Result<Option<ConnectorStatus>, KafkaConnectClientError>;

    async fn delete_connector(&self, name: &str) -> Result<(), KafkaConnectClientError>;
}

#[derive(Debug, Clone)]
pub struct KafkaConnectClient {
    host: String,
    client: Client,
}

impl KafkaConnectClient {
    pub fn new(base_url: &str) -> KafkaConnectClient {
        Self {
            host: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.host
    }

    async fn error_message(resp: reqwest::Response, fallback: String) -> String {
        resp.json::<ConnectErrorBody>()
            .await
            .map(|body| body.message)
            .unwrap_or(fallback)
    }

    async fn transition(&self, name: &str, action: &str) -> Result<(), KafkaConnectClientError> {
        let url = format!("{}/connectors/{}/{}", self.host, name, action);
        let resp = self.client.put(&url).send().await?;

        match resp.status() {
            StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => {
                debug!(connector = name, action, "connector transition accepted");
                Ok(())
            }
            StatusCode::NOT_FOUND => {
                let message =
                    Self::error_message(resp, format!("connector {name} not found")).await;
                Err(KafkaConnectClientError::not_found(message))
            }
            status => {
                let message =
                    Self::error_message(resp, format!("{action} request failed")).await;
                Err(KafkaConnectClientError::unexpected(format!(
                    "Failed to {action} connector {name}: {message} (status {})",
                    status.as_u16()
                )))
            }
        }
    }

    pub async fn get_connector_config(
        &self,
        conn_name: &str,
    ) -> Result<KafkaConnectorDeployedConfig, KafkaConnectClientError> {
        let url = format!("{}/connectors/{}", &self.host, conn_name);
        let resp = self.client.get(&url).send().await?;

        match resp.status() {
            status if status.is_success() => Ok(resp.json().await?),
            StatusCode::NOT_FOUND => Err(KafkaConnectClientError::not_found(format!(
                "connector {conn_name} not found"
            ))),
            _ => Err(KafkaConnectClientError::unexpected(
                "Failed to fetch connector config".to_string(),
            )),
        }
    }

    pub async fn deploy_connector(
        &self,
        cfg: &KafkaConnectorDeployConfig,
    ) -> Result<(), KafkaConnectClientError> {
        let resp = self
            .client
            .post(format!("{}/connectors", self.host))
            .json(cfg)
            .send()
            .await?;

        match resp.status() {
            StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => {
                debug!(connector = %cfg.name, "connector created");
                Ok(())
            }
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
                let message =
                    Self::error_message(resp, "could not parse error body".to_string()).await;
                Err(KafkaConnectClientError::failed_to_deploy(message))
            }
            StatusCode::INTERNAL_SERVER_ERROR => {
                let message =
                    Self::error_message(resp, "could not parse error body".to_string()).await;
                Err(KafkaConnectClientError::unexpected(format!(
                    "Failed to deploy connector due to unexpected issue: {}",
                    message
                )))
            }
            status => Err(KafkaConnectClientError::unexpected(format!(
                "Unexpected error trying to deploy connector due to {} - status code {}",
                status,
                status.as_u16()
            ))),
        }
    }
}

#[async_trait]
impl ConnectorCluster for KafkaConnectClient {
    async fn create_connector(
        &self,
        cfg: &KafkaConnectorDeployConfig,
    ) -> Result<(), KafkaConnectClientError> {
        self.deploy_connector(cfg).await
    }

    async fn pause_connector(&self, name: &str) -> Result<(), KafkaConnectClientError> {
        self.transition(name, "pause").await
    }

    async fn resume_connector(&self, name: &str) -> Result<(), KafkaConnectClientError> {
        self.transition(name, "resume").await
    }

    async fn connector_status(
        &self,
        name: &str,
    ) -> Result<Option<ConnectorStatus>, KafkaConnectClientError> {
        let url = format!("{}/connectors/{}/status", self.host, name);
        let resp = self.client.get(&url).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(resp.json().await?)),
            status => {
                let message = Self::error_message(resp, "status request failed".to_string()).await;
                Err(KafkaConnectClientError::unexpected(format!(
                    "Failed to fetch status for {name}: {message} (status {})",
                    status.as_u16()
                )))
            }
        }
    }

    async fn delete_connector(&self, name: &str) -> Result<(), KafkaConnectClientError> {
        let url = format!("{}/connectors/{}", self.host, name);
        let resp = self.client.delete(&url).send().await?;

        match resp.status() {
            StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(KafkaConnectClientError::not_found(format!(
                "connector {name} not found"
            ))),
            status => {
                let message = Self::error_message(resp, "delete request failed".to_string()).await;
                Err(KafkaConnectClientError::unexpected(format!(
                    "Failed to delete connector {name}: {message} (status {})",
                    status.as_u16()
                )))
            }
        }
    }
}
