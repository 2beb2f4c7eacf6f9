use crate::commands::{print_json, runtime, ControlPlane};
use clap::Args;
use common::error::CdcError;
use common::types::ConnectionConfig;
use serde_json::json;
use shared_clients::{create_introspector, SchemaIntrospector};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct ConnectionArgs {
    /// Name of an entry under `connections` in cdcctl.yml
    #[arg(long, value_name = "NAME")]
    pub connection: String,
}

#[derive(Debug, Args)]
pub struct ListTablesArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,

    #[arg(long)]
    pub with_columns: bool,
}

#[derive(Debug, Args)]
pub struct CreateTableArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,

    #[arg(long)]
    pub name: String,

    #[arg(long, value_name = "FILE")]
    pub ddl_file: PathBuf,
}

#[derive(Debug, Args)]
pub struct DescribeTableArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,

    /// `table` or `schema.table`
    #[arg(long)]
    pub table: String,
}

#[derive(Debug, Args)]
pub struct CountRowsArgs {
    #[command(flatten)]
    pub conn: ConnectionArgs,

    #[arg(long)]
    pub table: String,
}

fn load_connection(
    args: &ConnectionArgs,
    config_path: Option<PathBuf>,
) -> Result<ConnectionConfig, CdcError> {
    ControlPlane::load(config_path)?.connection(&args.connection)
}

pub fn handle_test_connection(args: &ConnectionArgs, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let config = load_connection(args, config_path)?;
    let ok = runtime()?.block_on(async {
        let mut introspector = create_introspector(&config);
        let ok = introspector.test_connection().await;
        introspector.close().await;
        ok
    });
    print_json(&json!({ "connection": args.connection, "ok": ok }))?;
    if ok {
        Ok(())
    } else {
        Err(CdcError::run_msg(format!("connection '{}' is not reachable", args.connection)))
    }
}

pub fn handle_list_tables(args: &ListTablesArgs, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let config = load_connection(&args.conn, config_path)?;
    let tables = runtime()?.block_on(async {
        let mut introspector = create_introspector(&config);
        let tables = introspector.list_tables(args.with_columns).await;
        introspector.close().await;
        tables
    });
    print_json(&tables.map_err(CdcError::run)?)
}

pub fn handle_describe_table(args: &DescribeTableArgs, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let config = load_connection(&args.conn, config_path)?;
    let columns = runtime()?
        .block_on(async {
            let mut introspector = create_introspector(&config);
            let columns = introspector.describe_table(&args.table).await;
            introspector.close().await;
            columns
        })
        .map_err(CdcError::run)?;
    if columns.is_empty() {
        return Err(CdcError::run_msg(format!("table '{}' not found", args.table)));
    }
    print_json(&json!({ "table": args.table, "columns": columns }))
}

pub fn handle_create_table(args: &CreateTableArgs, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let ddl = fs::read_to_string(&args.ddl_file).map_err(CdcError::init)?;
    let config = load_connection(&args.conn, config_path)?;
    runtime()?
        .block_on(async {
            let mut introspector = create_introspector(&config);
            let created = introspector.create_table(&args.name, &ddl).await;
            introspector.close().await;
            created
        })
        .map_err(CdcError::run)?;
    print_json(&json!({ "table": args.name, "created": true }))
}

pub fn handle_count_rows(args: &CountRowsArgs, config_path: Option<PathBuf>) -> Result<(), CdcError> {
    let config = load_connection(&args.conn, config_path)?;
    let rows = runtime()?
        .block_on(async {
            let mut introspector = create_introspector(&config);
            let rows = introspector.count_rows(&args.table).await;
            introspector.close().await;
            rows
        })
        .map_err(CdcError::run)?;
    print_json(&json!({ "table": args.table, "rows": rows }))
}
