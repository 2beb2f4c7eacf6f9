//! Pipelines and connections shared by the integration tests.

use chrono::Utc;
use common::types::{
    ColumnSelection, ConnectionConfig, EngineKind, NewPipeline, Pipeline, PipelineSettings,
    PipelineStatus, ResolvedPipeline, TableSelection,
};

pub const ORDERS_PIPELINE_ID: &str = "p1";

pub fn mysql_source() -> ConnectionConfig {
    ConnectionConfig::new(EngineKind::Mysql, "mysql.internal", 3306, "cdc", "secret", "shop")
}

pub fn postgres_target() -> ConnectionConfig {
    ConnectionConfig::new(EngineKind::Postgres, "pg.internal", 5432, "loader", "secret", "warehouse")
}

pub fn mssql_source() -> ConnectionConfig {
    ConnectionConfig::new(EngineKind::Mssql, "sql.internal", 1433, "sa", "secret", "sales")
        .with_schema("dbo")
}

pub fn orders_columns() -> Vec<ColumnSelection> {
    vec![
        ColumnSelection::new("id", "int").primary_key(),
        ColumnSelection::new("customer_id", "int"),
        ColumnSelection::new("order_date", "datetime"),
    ]
}

/// MySQL `orders` replicated into Postgres `orders_v2` with `order_date`
/// renamed to `placed_at`.
pub fn orders_new_pipeline() -> NewPipeline {
    NewPipeline {
        name: "orders".to_string(),
        owner: "system".to_string(),
        source: mysql_source(),
        target: postgres_target(),
        source_tables: vec![TableSelection::new("orders").with_columns(orders_columns())],
        target_tables: vec![TableSelection::new("orders_v2")
            .renamed_from("orders")
            .with_columns(orders_columns())
            .with_rename("order_date", "placed_at")],
        settings: PipelineSettings::default(),
    }
}

/// Resolve a pipeline input without going through a catalog.
pub fn resolve(new: NewPipeline, id: &str) -> ResolvedPipeline {
    let pipeline = Pipeline {
        id: id.to_string(),
        name: new.name,
        owner: new.owner,
        status: PipelineStatus::Draft,
        source_connection: format!("{id}-source"),
        target_connection: format!("{id}-target"),
        source_tables: new.source_tables,
        target_tables: new.target_tables,
        settings: new.settings,
        audit_refs: Vec::new(),
        last_run_at: None,
        last_success_at: None,
        last_error: None,
        created_at: Utc::now(),
    };
    ResolvedPipeline {
        pipeline,
        source: new.source,
        target: new.target,
    }
}

pub fn orders_pipeline() -> ResolvedPipeline {
    resolve(orders_new_pipeline(), ORDERS_PIPELINE_ID)
}

/// SQL Server source with three selected tables and one left out.
pub fn mssql_new_pipeline() -> NewPipeline {
    let tables = vec![
        TableSelection::new("orders").with_columns(orders_columns()),
        TableSelection::new("customers")
            .with_columns(vec![ColumnSelection::new("id", "int").primary_key()]),
        TableSelection::new("o'reilly_notes")
            .with_columns(vec![ColumnSelection::new("id", "int").primary_key()]),
        TableSelection::new("audit_trail").deselected(),
    ];
    NewPipeline {
        name: "sales".to_string(),
        owner: "system".to_string(),
        source: mssql_source(),
        target: postgres_target(),
        source_tables: tables.clone(),
        target_tables: tables,
        settings: PipelineSettings::default(),
    }
}
