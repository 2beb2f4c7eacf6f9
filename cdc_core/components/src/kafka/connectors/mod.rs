pub mod base;
pub mod sink;
pub mod source;

use crate::kafka::errors::ConnectorBuildError;
use crate::kafka::{ConnectorBuildData, ConnectorBuilder, ConnectorDescriptor};
use common::types::{ConnectorRole, EngineKind};
use std::collections::HashMap;
use tracing::debug;

/// Builders keyed by the engine and role they produce connectors for.
pub struct BuilderRegistry {
    builders: HashMap<(EngineKind, ConnectorRole), Box<dyn ConnectorBuilder>>,
}

impl BuilderRegistry {
    pub fn empty() -> Self {
        Self {
            builders: HashMap::new(),
        }
    }

    /// Capture builders for every engine plus a JDBC apply builder per target engine.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(source::mysql::MysqlCaptureBuilder));
        registry.register(Box::new(source::postgres::PostgresCaptureBuilder));
        registry.register(Box::new(source::mssql::MssqlCaptureBuilder));
        registry.register(Box::new(source::oracle::OracleCaptureBuilder));
        for engine in EngineKind::ALL {
            registry.register(Box::new(sink::jdbc::JdbcSinkBuilder::new(engine)));
        }
        registry
    }

    /// Replaces any builder already registered for the same pair.
    pub fn register(&mut self, builder: Box<dyn ConnectorBuilder>) {
        self.builders
            .insert((builder.engine(), builder.role()), builder);
    }

    pub fn get(
        &self,
        engine: EngineKind,
        role: ConnectorRole,
    ) -> Result<&dyn ConnectorBuilder, ConnectorBuildError> {
        self.builders
            .get(&(engine, role))
            .map(|b| b.as_ref())
            .ok_or_else(|| ConnectorBuildError::unsupported(engine, role))
    }

    /// Build the `role` connector; the engine comes from that side's connection.
    pub fn build(
        &self,
        role: ConnectorRole,
        data: &ConnectorBuildData,
    ) -> Result<ConnectorDescriptor, ConnectorBuildError> {
        let engine = data.pipeline.connection_for(role).engine;
        let descriptor = self.get(engine, role)?.build(data)?;
        debug!(
            connector = %descriptor.name,
            %engine,
            %role,
            keys = descriptor.config.len(),
            "built connector config"
        );
        Ok(descriptor)
    }
}

impl Default for BuilderRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_engine_has_both_roles() {
        let registry = BuilderRegistry::with_defaults();
        for engine in EngineKind::ALL {
            for role in ConnectorRole::BOTH {
                assert!(registry.get(engine, role).is_ok(), "{engine} {role}");
            }
        }
    }

    #[test]
    fn missing_builder_is_unsupported() {
        let registry = BuilderRegistry::empty();
        let err = registry
            .get(EngineKind::Oracle, ConnectorRole::Capture)
            .err()
            .unwrap();
        assert!(matches!(err, ConnectorBuildError::UnsupportedEngine { .. }));
    }
}
