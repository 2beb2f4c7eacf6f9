pub mod connectors;
pub mod errors;
pub mod helpers;
pub mod predicates;
pub mod smt;

pub use connectors::BuilderRegistry;

use crate::kafka::errors::ConnectorBuildError;
use crate::kafka::predicates::Predicates;
use crate::kafka::smt::Transforms;
use common::config::KafkaSettings;
use common::naming::ConnectorNames;
use common::types::{ConnectorRole, EngineKind, ResolvedPipeline, TableSelection};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as Json};

pub trait HasConnectorClass {
    fn connector_class(&self) -> &str;
}

/// Everything a builder needs to describe one half of a pipeline.
#[derive(Debug, Clone)]
pub struct ConnectorBuildData {
    pub pipeline: ResolvedPipeline,
    pub names: ConnectorNames,
    /// Unique replication client id; only the MySQL capture connector reads it.
    pub server_id: u64,
    pub kafka: KafkaSettings,
}

impl ConnectorBuildData {
    pub fn new(pipeline: ResolvedPipeline, server_id: u64, kafka: KafkaSettings) -> Self {
        let names = ConnectorNames::for_pipeline(&pipeline);
        Self {
            pipeline,
            names,
            server_id,
            kafka,
        }
    }

    /// Selected source tables; a pipeline without any cannot be built.
    pub fn selected_source_tables(&self) -> Result<Vec<&TableSelection>, ConnectorBuildError> {
        let tables: Vec<_> = self.pipeline.selected_source_tables().collect();
        if tables.is_empty() {
            return Err(ConnectorBuildError::missing_config(format!(
                "pipeline {} has no selected source tables",
                self.pipeline.id()
            )));
        }
        Ok(tables)
    }
}

/// A connector name plus its configuration, keys in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorDescriptor {
    pub name: String,
    pub config: JsonMap<String, Json>,
}

impl ConnectorDescriptor {
    /// Flatten a typed connector and its transform chain into one config map.
    pub fn from_parts<C: Serialize>(
        name: impl Into<String>,
        connector: &C,
        transforms: Option<&Transforms>,
        predicates: Option<&Predicates>,
    ) -> Result<Self, ConnectorBuildError> {
        let mut config = to_json_map(connector, "serialize connector")?;
        if let Some(transforms) = transforms {
            config.extend(to_json_map(transforms, "serialize transforms")?);
        }
        if let Some(predicates) = predicates.filter(|p| !p.is_empty()) {
            config.extend(to_json_map(predicates, "serialize predicates")?);
        }
        Ok(Self {
            name: name.into(),
            config,
        })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.config.get(key).and_then(Json::as_str)
    }

    /// The `config` object as posted to the cluster.
    pub fn config_json(&self) -> Json {
        Json::Object(self.config.clone())
    }

    pub fn to_json_string(&self) -> Result<String, ConnectorBuildError> {
        serde_json::to_string_pretty(self).map_err(|err| {
            ConnectorBuildError::serde_json("issue serialising connector", err)
        })
    }
}

impl HasConnectorClass for ConnectorDescriptor {
    fn connector_class(&self) -> &str {
        self.get("connector.class").unwrap_or_default()
    }
}

fn to_json_map<T: Serialize>(
    value: &T,
    what: &str,
) -> Result<JsonMap<String, Json>, ConnectorBuildError> {
    match serde_json::to_value(value).map_err(|err| ConnectorBuildError::serde_json(what, err))? {
        Json::Object(map) => Ok(map),
        other => Err(ConnectorBuildError::config(format!(
            "{what}: expected an object, got {other}"
        ))),
    }
}

/// Turns build data into the descriptor for one (engine, role) pair.
pub trait ConnectorBuilder: Send + Sync {
    fn engine(&self) -> EngineKind;

    fn role(&self) -> ConnectorRole;

    fn build(&self, data: &ConnectorBuildData) -> Result<ConnectorDescriptor, ConnectorBuildError>;
}
