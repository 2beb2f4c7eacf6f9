//! Runs against a throwaway Postgres container. Needs a Docker daemon, so it
//! is ignored by default: `cargo test -p shared_clients -- --ignored`.

use shared_clients::{
    create_db_client, create_introspector, DbClientError, DbEngineClient, QueryOptions, SqlParam,
};
use test_utils::setup_postgres;

#[tokio::test]
#[ignore]
async fn postgres_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let pg = setup_postgres().await?;
    let cfg = pg.connection();

    let mut introspector = create_introspector(&cfg);
    assert!(introspector.test_connection().await);

    introspector
        .create_table(
            "public.orders",
            "CREATE TABLE orders (id integer PRIMARY KEY, customer_id integer, note text);",
        )
        .await?;
    let again = introspector
        .create_table("public.orders", "CREATE TABLE orders (id integer)")
        .await;
    assert!(matches!(again, Err(DbClientError::TableExists { .. })));

    let mut client = create_db_client(&cfg);
    client.begin_transaction().await?;
    client
        .execute(
            "INSERT INTO orders (id, customer_id, note) VALUES ($1, $2, $3)",
            &[SqlParam::Int(1), SqlParam::Int(7), SqlParam::from("first")],
        )
        .await?;
    client.commit().await?;

    let rows = client
        .query("SELECT note FROM orders WHERE id = $1", &[SqlParam::Int(1)], QueryOptions::cached())
        .await?;
    assert_eq!(rows[0].get_str("note"), Some("first"));
    client.disconnect().await;
    client.disconnect().await;

    let tables = introspector.list_tables(true).await?;
    let orders = tables.iter().find(|t| t.name == "orders").expect("orders listed");
    assert_eq!(orders.columns.len(), 3);
    assert!(orders.columns[0].primary_key);
    assert_eq!(introspector.count_rows("public.orders").await?, 1);
    introspector.close().await;
    Ok(())
}
