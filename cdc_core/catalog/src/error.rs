use common::error::diagnostics::DiagnosticMessage;
use std::io;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog entry already exists: {context}")]
    Duplicate { context: DiagnosticMessage },
    /// Unknown id, or a pipeline that has been soft-deleted.
    #[error("catalog lookup failed: {context}")]
    NotFound { context: DiagnosticMessage },
    /// The catalog file exists but does not hold a catalog.
    #[error("catalog file is corrupt: {context}")]
    Corrupt {
        context: DiagnosticMessage,
        #[source]
        source: serde_json::Error,
    },
    #[error("catalog storage failed: {context}")]
    Storage {
        context: DiagnosticMessage,
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    #[track_caller]
    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::Duplicate {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            context: DiagnosticMessage::new(message.into()),
        }
    }

    #[track_caller]
    pub fn corrupt(path: &Path, source: serde_json::Error) -> Self {
        Self::Corrupt {
            context: DiagnosticMessage::new(path.display().to_string()),
            source,
        }
    }

    #[track_caller]
    pub fn storage(action: &str, path: &Path, source: io::Error) -> Self {
        Self::Storage {
            context: DiagnosticMessage::new(format!("{action} {}", path.display())),
            source,
        }
    }
}
