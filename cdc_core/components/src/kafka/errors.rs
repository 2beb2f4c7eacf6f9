use crate::kafka::smt::TransformBuildError;
use common::error::{DiagnosticMessage, UnsupportedEngineError};
use common::types::{ConnectorRole, EngineKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorBuildError {
    #[error("Expected config entry: {context}")]
    MissingConfig { context: DiagnosticMessage },
    #[error("Unsupported: {context}")]
    UnsupportedEngine { context: DiagnosticMessage },
    #[error("serde json error: {context}")]
    SerdeJson {
        context: DiagnosticMessage,
        #[source]
        source: serde_json::Error,
    },
    #[error("Config error: {context}")]
    ConfigError { context: DiagnosticMessage },
    #[error("Validation errors: {context}")]
    ValidationError { context: DiagnosticMessage },
}

impl ConnectorBuildError {
    #[track_caller]
    pub fn missing_config(message: impl Into<String>) -> Self {
        Self::MissingConfig {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn unsupported(engine: EngineKind, role: ConnectorRole) -> Self {
        Self::UnsupportedEngine {
            context: DiagnosticMessage::new(format!(
                "no {role} connector builder registered for {engine}"
            )),
        }
    }

    #[track_caller]
    pub fn serde_json(message: impl Into<String>, source: serde_json::Error) -> Self {
        Self::SerdeJson {
            context: DiagnosticMessage::new(message.into()),
            source,
        }
    }

    #[track_caller]
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::ValidationError {
            context: DiagnosticMessage::new(message.into()),
        }
    }
}

impl From<TransformBuildError> for ConnectorBuildError {
    fn from(value: TransformBuildError) -> Self {
        match value {
            TransformBuildError::InvalidValue { context } => {
                ConnectorBuildError::config(context.message())
            }
        }
    }
}

impl From<UnsupportedEngineError> for ConnectorBuildError {
    fn from(value: UnsupportedEngineError) -> Self {
        ConnectorBuildError::UnsupportedEngine {
            context: value.context,
        }
    }
}

/// Collects every validation problem of one connector before failing, so the
/// operator sees them all at once.
#[derive(Default)]
pub struct ErrorBag {
    msgs: Vec<String>,
}

impl ErrorBag {
    fn push<S: Into<String>>(&mut self, msg: S) {
        self.msgs.push(msg.into());
    }

    pub fn check_allowed(&mut self, name: &str, value: Option<&str>, allowed: &[&str]) {
        if let Some(v) = value {
            if !allowed.iter().any(|a| *a == v) {
                self.push(format!(
                    "{} has invalid value '{}'. Allowed: {}",
                    name,
                    v,
                    allowed.join(", ")
                ));
            }
        }
    }

    pub fn check_positive(&mut self, name: &str, value: Option<u32>) {
        if value == Some(0) {
            self.push(format!("{name} must be greater than zero."));
        }
    }

    pub fn finish(self) -> Result<(), ConnectorBuildError> {
        if self.msgs.is_empty() {
            Ok(())
        } else {
            Err(ConnectorBuildError::validation_error(self.msgs.join("\n")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bag_reports_every_problem() {
        let mut bag = ErrorBag::default();
        bag.check_allowed("insert.mode", Some("merge"), &["insert", "upsert"]);
        bag.check_allowed("snapshot.mode", None, &["initial"]);
        bag.check_positive("tasks.max", Some(0));

        let err = bag.finish().unwrap_err().to_string();
        assert!(err.contains("insert.mode has invalid value 'merge'"));
        assert!(err.contains("tasks.max must be greater than zero"));
    }
}
