mod commands;

use crate::commands::{
    handle_build, handle_cdc, handle_connector_show, handle_count_rows, handle_create_table,
    handle_delete, handle_describe_table, handle_list_tables, handle_monitor, handle_pause,
    handle_pipeline, handle_test_connection, handle_toggle, handle_watch, CdcSubcommand,
    ConnectionArgs, CountRowsArgs, CreateTableArgs, DescribeTableArgs, ListTablesArgs,
    MonitorArgs, PipelineSubcommand, ToggleArgs, WatchArgs,
};

use clap::{Parser, Subcommand};
use common::error::CdcError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cdcctl", about = "Control plane for CDC replication pipelines")]
pub struct Cli {
    #[arg(
        long = "config-path",
        short = 'c',
        help = "path to cdcctl.yml or the directory holding it",
        global = true
    )]
    pub config_path: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Cmd,
}

#[derive(Subcommand)]
pub enum Cmd {
    /// Register, list and inspect pipelines
    #[command(subcommand)]
    Pipeline(PipelineSubcommand),
    /// Start the capture and apply connectors of a pipeline
    Build { pipeline_id: String },
    /// Pause both connectors of a pipeline
    Pause { pipeline_id: String },
    /// Drive a single connector towards start or pause
    Toggle(ToggleArgs),
    /// Remove a pipeline's connectors and soft-delete it
    Delete { pipeline_id: String },
    /// Inspect or enable change tracking on a pipeline's source
    #[command(subcommand)]
    Cdc(CdcSubcommand),
    /// Check that a configured connection can be reached
    TestConnection(ConnectionArgs),
    /// List the tables visible through a configured connection
    ListTables(ListTablesArgs),
    /// Columns of one table
    DescribeTable(DescribeTableArgs),
    /// Create a table from a DDL file
    CreateTable(CreateTableArgs),
    /// Exact row count of one table
    CountRows(CountRowsArgs),
    /// Deployed config and live status of one connector
    ConnectorShow { name: String },
    /// Stream connector status changes until interrupted
    Watch(WatchArgs),
    /// Record the last sink offset commit of each pipeline as its last success
    Monitor(MonitorArgs),
}

fn run_cmd(func: Result<(), CdcError>) {
    if let Err(e) = func {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn main() {
    let cli = Cli::parse();
    match &cli.command {
        Cmd::Watch(_) | Cmd::Monitor(_) => logging::init_logger(),
        _ => logging::init_compact_logger(),
    }

    let config_path = cli.config_path.clone();
    match cli.command {
        Cmd::Pipeline(args) => run_cmd(handle_pipeline(args, config_path)),
        Cmd::Build { pipeline_id } => run_cmd(handle_build(&pipeline_id, config_path)),
        Cmd::Pause { pipeline_id } => run_cmd(handle_pause(&pipeline_id, config_path)),
        Cmd::Toggle(args) => run_cmd(handle_toggle(&args, config_path)),
        Cmd::Delete { pipeline_id } => run_cmd(handle_delete(&pipeline_id, config_path)),
        Cmd::Cdc(args) => run_cmd(handle_cdc(&args, config_path)),
        Cmd::TestConnection(args) => run_cmd(handle_test_connection(&args, config_path)),
        Cmd::ListTables(args) => run_cmd(handle_list_tables(&args, config_path)),
        Cmd::DescribeTable(args) => run_cmd(handle_describe_table(&args, config_path)),
        Cmd::CreateTable(args) => run_cmd(handle_create_table(&args, config_path)),
        Cmd::CountRows(args) => run_cmd(handle_count_rows(&args, config_path)),
        Cmd::ConnectorShow { name } => run_cmd(handle_connector_show(&name, config_path)),
        Cmd::Watch(args) => run_cmd(handle_watch(args, config_path)),
        Cmd::Monitor(args) => run_cmd(handle_monitor(args, config_path)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use common::types::{ConnectorAction, ConnectorRole};

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn toggle_accepts_either_role_vocabulary() {
        let cli = Cli::try_parse_from([
            "cdcctl", "toggle", "p1", "--role", "capture", "--action", "pause",
        ])
        .unwrap();
        let Cmd::Toggle(args) = cli.command else {
            panic!("expected toggle");
        };
        assert_eq!(args.role, ConnectorRole::Capture);
        assert_eq!(args.action, ConnectorAction::Pause);

        let cli = Cli::try_parse_from(["cdcctl", "toggle", "p1", "--role", "sink", "--action", "start"])
            .unwrap();
        assert!(matches!(cli.command, Cmd::Toggle(ToggleArgs { role: ConnectorRole::Apply, .. })));
    }

    #[test]
    fn config_path_is_global() {
        let cli = Cli::try_parse_from(["cdcctl", "build", "p1", "-c", "/etc/cdcctl"]).unwrap();
        assert_eq!(cli.config_path, Some(PathBuf::from("/etc/cdcctl")));
    }

    #[test]
    fn describe_table_takes_connection_and_table() {
        let cli = Cli::try_parse_from([
            "cdcctl", "describe-table", "--connection", "warehouse", "--table", "dbo.orders",
        ])
        .unwrap();
        let Cmd::DescribeTable(args) = cli.command else {
            panic!("expected describe-table");
        };
        assert_eq!(args.conn.connection, "warehouse");
        assert_eq!(args.table, "dbo.orders");
    }

    #[test]
    fn monitor_runs_once_on_request() {
        let cli = Cli::try_parse_from(["cdcctl", "monitor", "--once"]).unwrap();
        assert!(matches!(cli.command, Cmd::Monitor(MonitorArgs { once: true })));
        let cli = Cli::try_parse_from(["cdcctl", "monitor"]).unwrap();
        assert!(matches!(cli.command, Cmd::Monitor(MonitorArgs { once: false })));
    }

    #[test]
    fn watch_needs_at_least_one_pipeline() {
        assert!(Cli::try_parse_from(["cdcctl", "watch"]).is_err());
        assert!(Cli::try_parse_from(["cdcctl", "toggle", "p1", "--role", "both", "--action", "start"]).is_err());
    }
}
