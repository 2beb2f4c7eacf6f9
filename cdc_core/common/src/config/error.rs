use crate::error::diagnostics::DiagnosticMessage;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("config file missing: {context}")]
    MissingFile { context: DiagnosticMessage },
    #[error("malformed cdcctl.yml: {context}")]
    Parse {
        context: DiagnosticMessage,
        #[source]
        source: serde_yaml::Error,
    },
    /// Well-formed YAML carrying a value the control plane cannot run with.
    #[error("invalid setting: {context}")]
    Invalid { context: DiagnosticMessage },
    #[error("cannot read config: {context}")]
    Io {
        context: DiagnosticMessage,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    #[track_caller]
    pub fn missing_file(path: impl AsRef<Path>) -> Self {
        Self::MissingFile {
            context: DiagnosticMessage::new(format!("{} does not exist", path.as_ref().display())),
        }
    }

    #[track_caller]
    pub fn invalid(setting: &str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            context: DiagnosticMessage::new(format!("{setting} {}", reason.into())),
        }
    }
}

impl From<io::Error> for ConfigError {
    #[track_caller]
    fn from(source: io::Error) -> Self {
        ConfigError::Io {
            context: DiagnosticMessage::new(source.to_string()),
            source,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    #[track_caller]
    fn from(source: serde_yaml::Error) -> Self {
        ConfigError::Parse {
            context: DiagnosticMessage::new(source.to_string()),
            source,
        }
    }
}
