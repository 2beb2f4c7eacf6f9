use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::diagnostics::DiagnosticMessage;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Connect exports this per sink task once an offset commit completes.
pub const SINK_COMMIT_METRIC: &str = "kafka_connect_sink_task_offset_commit_completion";
pub const DEFAULT_LOOKBACK: &str = "1d";

#[derive(Debug, Error)]
pub enum PrometheusClientError {
    #[error("connectivity error: {context}")]
    FailedToConnect { context: DiagnosticMessage },
    #[error("query rejected: {context}")]
    QueryFailed { context: DiagnosticMessage },
    #[error("unexpected response: {context}")]
    UnexpectedError { context: DiagnosticMessage },
}

impl PrometheusClientError {
    #[track_caller]
    pub fn failed_to_connect(message: impl Into<String>) -> Self {
        Self::FailedToConnect {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed {
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

impl From<reqwest::Error> for PrometheusClientError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            PrometheusClientError::failed_to_connect(err.to_string())
        } else {
            PrometheusClientError::unexpected(format!(
                "Unexpected error trying to query prometheus: {err}"
            ))
        }
    }
}

/// Envelope every `/api/v1` endpoint answers with.
#[derive(Deserialize)]
struct ApiResponse<T> {
    status: String,
    data: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize)]
struct VectorData {
    #[serde(default)]
    result: Vec<VectorSample>,
}

/// One series of an instant-vector result: `value` is `[timestamp, "value"]`.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorSample {
    #[serde(default)]
    pub metric: HashMap<String, String>,
    pub value: (f64, String),
}

impl VectorSample {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        let millis = (self.value.0 * 1000.0).round() as i64;
        DateTime::from_timestamp_millis(millis)
    }

    pub fn number(&self) -> Option<f64> {
        self.value.1.parse().ok()
    }
}

/// Where the control plane reads connector metrics from.
#[async_trait]
pub trait MetricsSource: Send + Sync {
    /// Names of the connectors that currently export metrics.
    async fn connector_names(&self) -> Result<Vec<String>, PrometheusClientError>;

    /// Latest time any task of `connector` completed an offset commit, or
    /// `None` when nothing was committed inside the lookback window.
    async fn last_commit_time(
        &self,
        connector: &str,
    ) -> Result<Option<DateTime<Utc>>, PrometheusClientError>;
}

#[derive(Debug, Clone)]
pub struct PrometheusClient {
    host: String,
    lookback: String,
    client: Client,
}

impl PrometheusClient {
    pub fn new(base_url: &str) -> PrometheusClient {
        Self {
            host: base_url.trim_end_matches('/').to_string(),
            lookback: DEFAULT_LOOKBACK.to_string(),
            client: Client::new(),
        }
    }

    /// Range the commit metric is maximised over, in PromQL duration syntax.
    pub fn with_lookback(mut self, lookback: impl Into<String>) -> Self {
        self.lookback = lookback.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.host
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, PrometheusClientError> {
        let url = format!("{}{}", self.host, path);
        let resp = self.client.get(&url).query(params).send().await?;
        let status = resp.status();

        // Prometheus answers rejected queries with 400/422 and the usual envelope.
        let body: ApiResponse<T> = match resp.json().await {
            Ok(body) => body,
            Err(_) if status == StatusCode::NOT_FOUND => {
                return Err(PrometheusClientError::unexpected(format!(
                    "{url} is not a prometheus API endpoint"
                )))
            }
            Err(err) => return Err(err.into()),
        };

        match (body.status.as_str(), body.data) {
            ("success", Some(data)) => Ok(data),
            ("success", None) => Err(PrometheusClientError::unexpected(format!(
                "{path} returned no data"
            ))),
            _ => Err(PrometheusClientError::query_failed(format!(
                "{} (status {})",
                body.error.unwrap_or_else(|| "unknown error".to_string()),
                status.as_u16()
            ))),
        }
    }

    /// Run an instant query.
    pub async fn query(&self, promql: &str) -> Result<Vec<VectorSample>, PrometheusClientError> {
        debug!(query = promql, "prometheus query");
        let data: VectorData = self.get("/api/v1/query", &[("query", promql)]).await?;
        Ok(data.result)
    }

    pub async fn label_values(&self, label: &str) -> Result<Vec<String>, PrometheusClientError> {
        self.get(&format!("/api/v1/label/{label}/values"), &[]).await
    }

    fn commit_query(&self, connector: &str) -> String {
        let connector = connector.replace('\\', "\\\\").replace('"', "\\\"");
        format!(
            "max_over_time({SINK_COMMIT_METRIC}{{connector=\"{connector}\"}}[{}])",
            self.lookback
        )
    }
}

#[async_trait]
impl MetricsSource for PrometheusClient {
    async fn connector_names(&self) -> Result<Vec<String>, PrometheusClientError> {
        self.label_values("connector").await
    }

    async fn last_commit_time(
        &self,
        connector: &str,
    ) -> Result<Option<DateTime<Utc>>, PrometheusClientError> {
        let samples = self.query(&self.commit_query(connector)).await?;
        // Series whose commit count stayed at zero over the window carry no signal.
        Ok(samples
            .iter()
            .filter(|s| s.number().is_some_and(|v| v > 0.0))
            .filter_map(VectorSample::timestamp)
            .max())
    }
}
