use crate::commands::{print_json, runtime, ControlPlane};
use common::error::CdcError;
use common::naming::parse_connector_name;
use serde_json::json;
use shared_clients::kafka::{ConnectorCluster, KafkaConnectClientError};
use std::path::PathBuf;

pub fn handle_connector_show(name: &str, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let plane = ControlPlane::load(config_path)?;
    let cluster = plane.cluster();
    let (deployed, status) = runtime()?.block_on(async {
        let deployed = cluster.get_connector_config(name).await?;
        let status = cluster.connector_status(name).await?;
        Ok::<_, KafkaConnectClientError>((deployed, status))
    })
    .map_err(CdcError::run)?;

    let parsed = parse_connector_name(name);
    print_json(&json!({
        "name": deployed.name,
        "pipeline_id": parsed.as_ref().map(|p| &p.pipeline_id),
        "role": parsed.as_ref().map(|p| p.role),
        "config": deployed.config,
        "summary": status.as_ref().map(|s| s.summary()),
        "status": status,
    }))
}
