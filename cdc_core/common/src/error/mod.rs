pub mod diagnostics;
pub use crate::config::error::ConfigError;
pub use diagnostics::DiagnosticMessage;

use std::error::Error as StdError;
use thiserror::Error;

/// Top-level failure reported by the command line front-end.
#[derive(Debug, Error)]
pub enum CdcError {
    #[error("initialisation failed: {context}")]
    Init {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
    #[error("run failed: {context}")]
    Run {
        context: DiagnosticMessage,
        #[source]
        source: Option<Box<dyn StdError + Send + Sync>>,
    },
}

impl CdcError {
    #[track_caller]
    pub fn init<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        CdcError::Init {
            context: DiagnosticMessage::new(err.to_string()),
            source: Some(Box::new(err)),
        }
    }

    #[track_caller]
    pub fn init_msg(message: impl Into<String>) -> Self {
        CdcError::Init {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }

    #[track_caller]
    pub fn run<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        CdcError::Run {
            context: DiagnosticMessage::new(err.to_string()),
            source: Some(Box::new(err)),
        }
    }

    #[track_caller]
    pub fn run_msg(message: impl Into<String>) -> Self {
        CdcError::Run {
            context: DiagnosticMessage::new(message.into()),
            source: None,
        }
    }
}

/// Raised when a string tag does not name one of the supported engines.
#[derive(Debug, Error)]
#[error("unsupported engine: {context}")]
pub struct UnsupportedEngineError {
    pub context: DiagnosticMessage,
}

impl UnsupportedEngineError {
    #[track_caller]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            context: DiagnosticMessage::new(format!(
                "'{}' is not one of mysql, postgres, mssql, oracle",
                tag.into()
            )),
        }
    }
}
