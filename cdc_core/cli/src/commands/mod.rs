mod cdc;
mod connector;
mod database;
mod monitor;
mod pipeline;
mod watch;

pub use cdc::{handle_cdc, CdcSubcommand};
pub use connector::handle_connector_show;
pub use database::{
    handle_count_rows, handle_create_table, handle_describe_table, handle_list_tables,
    handle_test_connection, ConnectionArgs, CountRowsArgs, CreateTableArgs, DescribeTableArgs,
    ListTablesArgs,
};
pub use monitor::{handle_monitor, MonitorArgs};
pub use pipeline::{
    handle_build, handle_delete, handle_pause, handle_pipeline, handle_toggle,
    PipelineSubcommand, ToggleArgs,
};
pub use watch::{handle_watch, WatchArgs};

use catalog::MemoryCatalog;
use common::config::loader::read_config;
use common::config::ControlPlaneConfig;
use common::error::CdcError;
use common::types::ConnectionConfig;
use components::BuilderRegistry;
use executor::{CdcReadinessService, ConnectorLifecycleController};
use serde::Serialize;
use shared_clients::kafka::KafkaConnectClient;
use shared_clients::EngineClientFactory;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tracing::warn;

/// Loaded config plus the catalog it points at.
pub(crate) struct ControlPlane {
    pub config: ControlPlaneConfig,
    pub catalog: MemoryCatalog,
}

impl ControlPlane {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, CdcError> {
        let config = read_config(config_path).map_err(CdcError::init)?;
        let catalog = match &config.catalog.path {
            Some(path) => MemoryCatalog::load_from(path).map_err(CdcError::init)?,
            None => MemoryCatalog::new(),
        };
        Ok(Self { config, catalog })
    }

    /// Write the catalog back to `catalog.path`.
    pub fn persist(&self) -> Result<(), CdcError> {
        match &self.config.catalog.path {
            Some(path) => self.catalog.flush_to(path).map_err(CdcError::run),
            None => {
                warn!("catalog.path is not set, changes are kept for this run only");
                Ok(())
            }
        }
    }

    pub fn cluster(&self) -> Arc<KafkaConnectClient> {
        Arc::new(KafkaConnectClient::new(&self.config.connect.url))
    }

    pub fn cdc(&self) -> CdcReadinessService {
        CdcReadinessService::new(Arc::new(self.catalog.clone()), Arc::new(EngineClientFactory))
            .with_query_retries(self.config.database.query_retries)
    }

    pub fn controller(&self) -> ConnectorLifecycleController {
        ConnectorLifecycleController::new(
            Arc::new(self.catalog.clone()),
            self.cluster(),
            Arc::new(self.cdc()),
            Arc::new(BuilderRegistry::with_defaults()),
            self.config.kafka.clone(),
        )
    }

    pub fn connection(&self, name: &str) -> Result<ConnectionConfig, CdcError> {
        self.config.connections.get(name).cloned().ok_or_else(|| {
            CdcError::init_msg(format!("no connection named '{name}' under `connections`"))
        })
    }
}

pub(crate) fn runtime() -> Result<Runtime, CdcError> {
    Runtime::new().map_err(CdcError::init)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), CdcError> {
    let out = serde_json::to_string_pretty(value).map_err(CdcError::run)?;
    println!("{out}");
    Ok(())
}
