pub mod audit;
pub mod connection;
pub mod connector;
pub mod engine;
pub mod pipeline;
pub mod tables;

pub use audit::{AuditOutcome, ConnectorAuditLogEntry};
pub use connection::{ConnectionConfig, ConnectionId, ConnectionIdentity, TlsConfig};
pub use connector::{ConnectorAction, ConnectorRole, SummaryStatus, ToggleOutcome};
pub use engine::EngineKind;
pub use pipeline::{
    NewPipeline, Pipeline, PipelineId, PipelineSettings, PipelineStatus, ResolvedPipeline,
};
pub use tables::{ColumnRename, ColumnSelection, TableSelection};
