//! Connector descriptors for the capture and apply halves of a pipeline.
//!
//! Everything here is a pure transformation of pipeline data into the flat
//! key/value configuration a Kafka Connect cluster accepts; nothing performs I/O.

#[cfg(feature = "kafka")]
pub mod kafka;

#[cfg(feature = "kafka")]
pub use kafka::{
    BuilderRegistry, ConnectorBuildData, ConnectorBuilder, ConnectorDescriptor, HasConnectorClass,
};
