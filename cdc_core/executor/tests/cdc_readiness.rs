use catalog::{MemoryCatalog, Register};
use executor::cdc::ENABLE_DATABASE_SQL;
use executor::{CdcReadiness, CdcReadinessService, ExecutorError};
use serde_json::json;
use std::sync::Arc;
use test_utils::fixtures::{mssql_new_pipeline, orders_new_pipeline};
use test_utils::{row, ScriptedClientFactory, ScriptedDb};

fn service(catalog: &MemoryCatalog, db: &ScriptedDb) -> CdcReadinessService {
    CdcReadinessService::new(
        Arc::new(catalog.clone()),
        Arc::new(ScriptedClientFactory::new(db.clone())),
    )
    .with_query_retries(1)
}

/// Database off, `orders` and `o'reilly_notes` tracked, `customers` not.
fn partially_tracked() -> ScriptedDb {
    ScriptedDb::new()
        .on("sys.databases", vec![row([("is_cdc_enabled", json!(0))])])
        .on(
            "sys.tables",
            vec![
                row([("name", json!("orders")), ("is_tracked_by_cdc", json!(1))]),
                row([("name", json!("customers")), ("is_tracked_by_cdc", json!(0))]),
                row([("name", json!("o'reilly_notes")), ("is_tracked_by_cdc", json!(1))]),
            ],
        )
}

#[tokio::test]
async fn check_lists_database_switch_before_untracked_tables() {
    let catalog = MemoryCatalog::new();
    let db = partially_tracked();
    let pipeline = catalog.register_pipeline(mssql_new_pipeline()).unwrap();

    let readiness = service(&catalog, &db).check(&pipeline.id).await.unwrap();

    assert!(!readiness.enabled);
    assert_eq!(readiness.remediation.len(), 2);
    assert_eq!(readiness.remediation[0], ENABLE_DATABASE_SQL);
    assert_eq!(
        readiness.remediation[1],
        "EXEC sys.sp_cdc_enable_table @source_schema = N'dbo', @source_name = N'customers', @role_name = NULL, @supports_net_changes = 1"
    );

    // the deselected table is never asked about
    let lookup = db
        .statements()
        .into_iter()
        .find(|s| s.contains("sys.tables"))
        .unwrap();
    assert!(lookup.contains("N'o''reilly_notes'"));
    assert!(!lookup.contains("audit_trail"));
}

#[tokio::test]
async fn zero_selected_tables_reduce_to_database_state() {
    let catalog = MemoryCatalog::new();
    let db = ScriptedDb::new().on("sys.databases", vec![row([("is_cdc_enabled", json!(true))])]);
    let mut new = mssql_new_pipeline();
    for table in &mut new.source_tables {
        table.selected = false;
    }
    let pipeline = catalog.register_pipeline(new).unwrap();

    let readiness = service(&catalog, &db).check(&pipeline.id).await.unwrap();

    assert_eq!(readiness, CdcReadiness::ready());
    assert_eq!(db.count_matching("sys.tables"), 0);
}

#[tokio::test]
async fn native_log_sources_are_ready_without_a_connection() {
    let catalog = MemoryCatalog::new();
    let db = ScriptedDb::new().refuse_connections();
    let pipeline = catalog.register_pipeline(orders_new_pipeline()).unwrap();

    let readiness = service(&catalog, &db).check(&pipeline.id).await.unwrap();

    assert!(readiness.enabled);
    assert_eq!(db.connects(), 0);
}

#[tokio::test]
async fn enable_runs_remediation_in_order() {
    let catalog = MemoryCatalog::new();
    let db = partially_tracked();
    let pipeline = catalog.register_pipeline(mssql_new_pipeline()).unwrap();

    let applied = service(&catalog, &db).enable(&pipeline.id).await.unwrap();

    assert_eq!(applied.len(), 2);
    let executed: Vec<String> = db
        .statements()
        .into_iter()
        .filter(|s| s.starts_with("EXEC"))
        .collect();
    assert_eq!(executed, applied);
}

#[tokio::test]
async fn enable_on_ready_source_runs_nothing() {
    let catalog = MemoryCatalog::new();
    let db = ScriptedDb::new()
        .on("sys.databases", vec![row([("is_cdc_enabled", json!(true))])])
        .on(
            "sys.tables",
            ["orders", "customers", "o'reilly_notes"]
                .into_iter()
                .map(|name| row([("name", json!(name)), ("is_tracked_by_cdc", json!(true))]))
                .collect(),
        );
    let pipeline = catalog.register_pipeline(mssql_new_pipeline()).unwrap();

    let applied = service(&catalog, &db).enable(&pipeline.id).await.unwrap();

    assert!(applied.is_empty());
    assert_eq!(db.count_matching("EXEC"), 0);
}

#[tokio::test]
async fn tracked_names_match_regardless_of_case() {
    let catalog = MemoryCatalog::new();
    let db = ScriptedDb::new()
        .on("sys.databases", vec![row([("is_cdc_enabled", json!(true))])])
        .on(
            "sys.tables",
            ["Orders", "CUSTOMERS", "O'Reilly_Notes"]
                .into_iter()
                .map(|name| row([("name", json!(name)), ("is_tracked_by_cdc", json!(1))]))
                .collect(),
        );
    let pipeline = catalog.register_pipeline(mssql_new_pipeline()).unwrap();

    let readiness = service(&catalog, &db).check(&pipeline.id).await.unwrap();

    assert!(readiness.enabled, "{:?}", readiness.remediation);
    assert!(readiness.remediation.is_empty());
}

#[tokio::test]
async fn enable_stops_at_first_failing_statement() {
    let catalog = MemoryCatalog::new();
    let db = partially_tracked().fail_on("sp_cdc_enable_db", "permission denied");
    let pipeline = catalog.register_pipeline(mssql_new_pipeline()).unwrap();

    let err = service(&catalog, &db).enable(&pipeline.id).await.unwrap_err();

    assert!(matches!(err, ExecutorError::CdcEnable { .. }));
    assert_eq!(db.count_matching("sp_cdc_enable_table"), 0);
}

#[tokio::test]
async fn unreachable_source_fails_check() {
    let catalog = MemoryCatalog::new();
    let db = ScriptedDb::new().refuse_connections();
    let pipeline = catalog.register_pipeline(mssql_new_pipeline()).unwrap();

    let err = service(&catalog, &db).check(&pipeline.id).await.unwrap_err();

    assert!(matches!(err, ExecutorError::FailedToConnect { .. }));
}
