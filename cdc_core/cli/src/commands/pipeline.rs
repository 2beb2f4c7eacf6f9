use crate::commands::{print_json, runtime, ControlPlane};
use catalog::{AuditLog, Getter, Register};
use clap::{Args, Subcommand};
use common::error::CdcError;
use common::types::{ConnectorAction, ConnectorRole, NewPipeline, ToggleOutcome};
use executor::{ExecutorError, PipelineRunReport};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Subcommand)]
pub enum PipelineSubcommand {
    /// Register a pipeline described in a YAML file
    Add {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
    /// List live pipelines, oldest first
    List,
    /// Show one pipeline and the latest audit entry per connector
    Show { pipeline_id: String },
}

#[derive(Debug, Args)]
pub struct ToggleArgs {
    pub pipeline_id: String,

    /// `source` / `capture` or `sink` / `apply`
    #[arg(long)]
    pub role: ConnectorRole,

    /// `start` or `pause`
    #[arg(long)]
    pub action: ConnectorAction,
}

pub fn handle_pipeline(args: PipelineSubcommand, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let plane = ControlPlane::load(config_path)?;
    match args {
        PipelineSubcommand::Add { file } => {
            let raw = fs::read_to_string(&file).map_err(CdcError::init)?;
            let new: NewPipeline = serde_yaml::from_str(&raw).map_err(CdcError::init)?;
            let pipeline = plane.catalog.register_pipeline(new).map_err(CdcError::run)?;
            plane.persist()?;
            info!(pipeline_id = %pipeline.id, "registered pipeline {}", pipeline.name);
            print_json(&pipeline)
        }
        PipelineSubcommand::List => print_json(&plane.catalog.list_pipelines()),
        PipelineSubcommand::Show { pipeline_id } => {
            let pipeline = plane.catalog.get_pipeline(&pipeline_id).map_err(CdcError::run)?;
            let latest = plane.catalog.latest_audit_by_pipeline(&pipeline_id);
            print_json(&json!({ "pipeline": pipeline, "latest_audit": latest }))
        }
    }
}

fn report_run(
    plane: &ControlPlane,
    result: Result<PipelineRunReport, ExecutorError>,
) -> Result<(), CdcError> {
    // audit entries and run stamps are written on failure too
    plane.persist()?;
    match result {
        Ok(report) => print_json(&report),
        Err(err) => {
            if let Some(remediation) = err.remediation() {
                print_json(&json!({ "error": err.message(), "remediation": remediation }))?;
            }
            Err(CdcError::run(err))
        }
    }
}

pub fn handle_build(pipeline_id: &str, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let plane = ControlPlane::load(config_path)?;
    let result = runtime()?.block_on(plane.controller().build(pipeline_id));
    report_run(&plane, result)
}

pub fn handle_pause(pipeline_id: &str, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let plane = ControlPlane::load(config_path)?;
    let result = runtime()?.block_on(plane.controller().pause(pipeline_id));
    report_run(&plane, result)
}

pub fn handle_toggle(args: &ToggleArgs, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let plane = ControlPlane::load(config_path)?;
    let outcome = runtime()?.block_on(plane.controller().toggle(
        &args.pipeline_id,
        args.role,
        args.action,
    ));
    plane.persist()?;
    print_json(&json!({
        "pipeline_id": args.pipeline_id,
        "role": args.role,
        "action": args.action,
        "result": outcome,
    }))?;
    match outcome {
        ToggleOutcome::Error(message) => Err(CdcError::run_msg(message)),
        _ => Ok(()),
    }
}

pub fn handle_delete(pipeline_id: &str, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let plane = ControlPlane::load(config_path)?;
    let removed = runtime()?
        .block_on(plane.controller().delete(pipeline_id))
        .map_err(CdcError::run)?;
    plane.persist()?;
    print_json(&json!({ "pipeline_id": pipeline_id, "removed_connectors": removed }))
}
