use common::types::EngineKind;
use serde_json::json;
use shared_clients::{introspector_for, DbClientError, DbClientFactory, SchemaIntrospector};
use test_utils::fixtures::{mssql_source, mysql_source, postgres_target};
use test_utils::{row, ScriptedClientFactory, ScriptedDb};

#[tokio::test]
async fn count_rows_rejects_bad_identifiers_before_any_sql() {
    let db = ScriptedDb::new();
    let mut introspector = introspector_for(postgres_target(), Box::new(db.client(EngineKind::Postgres)));

    let err = introspector.count_rows("DROP TABLE x; --").await.unwrap_err();

    assert!(matches!(err, DbClientError::InvalidIdentifier { .. }));
    assert!(db.statements().is_empty());
    assert_eq!(db.connects(), 0);
}

#[tokio::test]
async fn count_rows_quotes_the_name() -> Result<(), DbClientError> {
    let db = ScriptedDb::new().on("count_big", vec![row([("cnt", json!(42))])]);
    let mut introspector = introspector_for(mssql_source(), Box::new(db.client(EngineKind::Mssql)));

    assert_eq!(introspector.count_rows("dbo.orders").await?, 42);
    assert_eq!(db.statements(), vec!["SELECT COUNT_BIG(*) AS cnt FROM [dbo].[orders]"]);
    Ok(())
}

#[tokio::test]
async fn test_connection_reports_false_instead_of_failing() {
    let db = ScriptedDb::new().refuse_connections();
    let factory = ScriptedClientFactory::new(db);
    let mut introspector = factory.introspector(&mysql_source());

    assert!(!introspector.test_connection().await);
}

#[tokio::test]
async fn create_table_refuses_existing_table() {
    let db = ScriptedDb::new().on("information_schema.tables", vec![row([("table_name", json!("orders"))])]);
    let mut introspector = introspector_for(postgres_target(), Box::new(db.client(EngineKind::Postgres)));

    let err = introspector
        .create_table("orders", "CREATE TABLE orders (id int);")
        .await
        .unwrap_err();

    assert!(matches!(err, DbClientError::TableExists { .. }));
    assert_eq!(db.count_matching("CREATE TABLE"), 0);
}

#[tokio::test]
async fn create_table_runs_ddl_inside_schema() -> Result<(), DbClientError> {
    let db = ScriptedDb::new();
    let mut introspector = introspector_for(postgres_target(), Box::new(db.client(EngineKind::Postgres)));

    introspector
        .create_table("staging.orders", "CREATE TABLE orders (id int);  ")
        .await?;

    let statements = db.statements();
    assert_eq!(statements.len(), 3);
    assert_eq!(statements[1], "SET search_path TO \"staging\"");
    assert_eq!(statements[2], "CREATE TABLE orders (id int)");
    Ok(())
}

#[tokio::test]
async fn list_tables_attaches_columns_on_request() -> Result<(), DbClientError> {
    let db = ScriptedDb::new()
        .on(
            "information_schema.columns",
            vec![
                row([
                    ("table_schema", json!("shop")),
                    ("table_name", json!("orders")),
                    ("column_name", json!("id")),
                    ("data_type", json!("int(11)")),
                    ("is_nullable", json!("NO")),
                    ("is_primary_key", json!(1)),
                ]),
                row([
                    ("table_schema", json!("shop")),
                    ("table_name", json!("orders")),
                    ("column_name", json!("order_date")),
                    ("data_type", json!("datetime")),
                    ("is_nullable", json!("YES")),
                    ("is_primary_key", json!(0)),
                ]),
            ],
        )
        .on(
            "information_schema.tables",
            vec![row([("table_schema", json!("shop")), ("table_name", json!("orders"))])],
        );
    let mut introspector = introspector_for(mysql_source(), Box::new(db.client(EngineKind::Mysql)));

    let bare = introspector.list_tables(false).await?;
    assert_eq!(bare.len(), 1);
    assert!(bare[0].columns.is_empty());

    let full = introspector.list_tables(true).await?;
    let columns = &full[0].columns;
    assert_eq!(columns.len(), 2);
    assert!(columns[0].primary_key);
    assert!(!columns[1].primary_key);
    assert_eq!(full[0].schema.as_deref(), Some("shop"));
    Ok(())
}
