use crate::commands::{print_json, runtime, ControlPlane};
use clap::Subcommand;
use common::error::CdcError;
use serde_json::json;
use std::path::PathBuf;

#[derive(Debug, Subcommand)]
pub enum CdcSubcommand {
    /// Report whether the source is ready and what would make it so
    Check { pipeline_id: String },
    /// Run the statements `check` reports
    Enable { pipeline_id: String },
}

pub fn handle_cdc(args: &CdcSubcommand, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let plane = ControlPlane::load(config_path)?;
    let service = plane.cdc();
    let rt = runtime()?;
    match args {
        CdcSubcommand::Check { pipeline_id } => {
            let readiness = rt
                .block_on(service.check(pipeline_id))
                .map_err(CdcError::run)?;
            print_json(&readiness)
        }
        CdcSubcommand::Enable { pipeline_id } => {
            let applied = rt
                .block_on(service.enable(pipeline_id))
                .map_err(CdcError::run)?;
            print_json(&json!({ "pipeline_id": pipeline_id, "executed": applied }))
        }
    }
}
