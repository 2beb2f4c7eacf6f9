//! Services that act on pipelines: CDC readiness on the source engine,
//! connector lifecycle against the Connect cluster, the live status stream and
//! the last-success monitor.

pub mod cdc;
pub mod lifecycle;
pub mod monitor;
pub mod status_stream;

pub use cdc::{CdcReadiness, CdcReadinessService};
pub use lifecycle::{ConnectorLifecycleController, PipelineRunReport, DEFAULT_ACTOR};
pub use monitor::{LastSuccessMonitor, LastSuccessUpdate};
pub use status_stream::{
    ConnectorStatusReport, PipelineStatusGroup, StatusEvent, StatusEventKind,
    StatusReconciliationStream, Subscription,
};

use catalog::CatalogError;
use common::error::diagnostics::DiagnosticMessage;
use components::kafka::errors::ConnectorBuildError;
use shared_clients::kafka::KafkaConnectClientError;
use shared_clients::prometheus::PrometheusClientError;
use shared_clients::DbClientError;
use std::error::Error;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("connection failed: {context}")]
    FailedToConnect {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    #[error("execution failed: {context}")]
    FailedToExecute {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    #[error("unexpected error: {context}")]
    UnexpectedError {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    #[error("configuration error: {context}")]
    ConfigError {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
    #[error("resource not found: {context}")]
    ResourceNotFound { context: DiagnosticMessage },
    #[error("unsupported engine: {context}")]
    UnsupportedEngine { context: DiagnosticMessage },
    #[error("CDC is not enabled: {context}")]
    CdcNotEnabled {
        context: DiagnosticMessage,
        /// Statements that would enable it, in execution order.
        remediation: Vec<String>,
    },
    #[error("failed to enable CDC: {context}")]
    CdcEnable {
        context: DiagnosticMessage,
        #[source]
        source: DbClientError,
    },
    #[error("connector transition failed: {context}")]
    ConnectorTransition { context: DiagnosticMessage },
}

impl ExecutorError {
    #[track_caller]
    pub fn cdc_not_enabled(message: impl Into<String>, remediation: Vec<String>) -> Self {
        Self::CdcNotEnabled {
            context: DiagnosticMessage::new(message.into()),
            remediation,
        }
    }

    #[track_caller]
    pub fn cdc_enable(message: impl Into<String>, source: DbClientError) -> Self {
        Self::CdcEnable {
            context: DiagnosticMessage::new(message.into()),
            source,
        }
    }

    #[track_caller]
    pub fn connector_transition(message: impl Into<String>) -> Self {
        Self::ConnectorTransition {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    /// Remediation statements carried by [`ExecutorError::CdcNotEnabled`].
    pub fn remediation(&self) -> Option<&[String]> {
        match self {
            ExecutorError::CdcNotEnabled { remediation, .. } => Some(remediation),
            _ => None,
        }
    }

    /// The bare message, without the call-site suffix.
    pub fn message(&self) -> String {
        match self {
            ExecutorError::FailedToConnect { context, .. }
            | ExecutorError::FailedToExecute { context, .. }
            | ExecutorError::UnexpectedError { context, .. }
            | ExecutorError::ConfigError { context, .. }
            | ExecutorError::ResourceNotFound { context }
            | ExecutorError::UnsupportedEngine { context }
            | ExecutorError::CdcNotEnabled { context, .. }
            | ExecutorError::CdcEnable { context, .. }
            | ExecutorError::ConnectorTransition { context } => context.message().to_string(),
        }
    }
}

impl From<DbClientError> for ExecutorError {
    #[track_caller]
    fn from(value: DbClientError) -> Self {
        match value {
            DbClientError::UnsupportedEngine { context } => {
                ExecutorError::UnsupportedEngine { context }
            }
            DbClientError::Config { context } => ExecutorError::ConfigError {
                context,
                source: None,
            },
            other if other.is_connection() => ExecutorError::FailedToConnect {
                context: DiagnosticMessage::new(other.to_string()),
                source: Some(Box::new(other)),
            },
            other => ExecutorError::FailedToExecute {
                context: DiagnosticMessage::new(other.to_string()),
                source: Some(Box::new(other)),
            },
        }
    }
}

impl From<KafkaConnectClientError> for ExecutorError {
    #[track_caller]
    fn from(value: KafkaConnectClientError) -> Self {
        match value {
            KafkaConnectClientError::NotFound { context } => {
                ExecutorError::ResourceNotFound { context }
            }
            KafkaConnectClientError::FailedToConnect { context } => {
                ExecutorError::FailedToConnect {
                    context,
                    source: None,
                }
            }
            KafkaConnectClientError::FailedToDeploy { context } => {
                ExecutorError::FailedToExecute {
                    context,
                    source: None,
                }
            }
            KafkaConnectClientError::UnexpectedError { context } => {
                ExecutorError::UnexpectedError {
                    context,
                    source: None,
                }
            }
        }
    }
}

impl From<ConnectorBuildError> for ExecutorError {
    #[track_caller]
    fn from(value: ConnectorBuildError) -> Self {
        match value {
            ConnectorBuildError::UnsupportedEngine { context } => {
                ExecutorError::UnsupportedEngine { context }
            }
            ConnectorBuildError::SerdeJson { context, source } => ExecutorError::UnexpectedError {
                context,
                source: Some(Box::new(source)),
            },
            ConnectorBuildError::MissingConfig { context }
            | ConnectorBuildError::ConfigError { context }
            | ConnectorBuildError::ValidationError { context } => ExecutorError::ConfigError {
                context,
                source: None,
            },
        }
    }
}

impl From<PrometheusClientError> for ExecutorError {
    #[track_caller]
    fn from(value: PrometheusClientError) -> Self {
        match value {
            PrometheusClientError::FailedToConnect { context } => ExecutorError::FailedToConnect {
                context,
                source: None,
            },
            PrometheusClientError::QueryFailed { context }
            | PrometheusClientError::UnexpectedError { context } => {
                ExecutorError::FailedToExecute {
                    context,
                    source: None,
                }
            }
        }
    }
}

impl From<CatalogError> for ExecutorError {
    #[track_caller]
    fn from(value: CatalogError) -> Self {
        match value {
            CatalogError::NotFound { context } => ExecutorError::ResourceNotFound { context },
            CatalogError::Duplicate { context } => ExecutorError::ConfigError {
                context,
                source: None,
            },
            other => ExecutorError::UnexpectedError {
                context: DiagnosticMessage::new(other.to_string()),
                source: Some(Box::new(other)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layer_errors_map_to_executor_variants() {
        let err: ExecutorError = KafkaConnectClientError::not_found("connector x").into();
        assert!(matches!(err, ExecutorError::ResourceNotFound { .. }));

        let err: ExecutorError = DbClientError::connection("refused").into();
        assert!(matches!(err, ExecutorError::FailedToConnect { .. }));

        let err: ExecutorError = DbClientError::table_exists("dbo.orders").into();
        assert!(matches!(err, ExecutorError::FailedToExecute { .. }));

        let err: ExecutorError = ConnectorBuildError::missing_config("no tables").into();
        assert_eq!(err.message(), "no tables");
    }

    #[test]
    fn cdc_not_enabled_carries_statements() {
        let err = ExecutorError::cdc_not_enabled("p1", vec!["EXEC sys.sp_cdc_enable_db".into()]);
        assert_eq!(err.remediation().map(<[String]>::len), Some(1));
        let unexpected = ExecutorError::UnexpectedError {
            context: DiagnosticMessage::new("x".to_string()),
            source: None,
        };
        assert!(unexpected.remediation().is_none());
    }
}
