pub mod helpers;
pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;

use crate::introspect::helpers::{
    attach_columns, column_from_row, is_safe_table_name, quote_identifier, split_qualified,
    strip_trailing_semicolon, tables_from_rows,
};
use crate::introspect::mssql::MssqlCatalog;
use crate::introspect::mysql::MysqlCatalog;
use crate::introspect::oracle::OracleCatalog;
use crate::introspect::postgres::PostgresCatalog;
use crate::{create_db_client, BoxedDbClient, DbClientError, QueryOptions, SqlParam};
use async_trait::async_trait;
use common::types::{ColumnSelection, ConnectionConfig, EngineKind, TableSelection};
use tracing::{debug, info, warn};

/// A statement plus its positional parameters.
pub type CatalogQuery = (String, Vec<SqlParam>);

/// Schema discovery against one configured database.
#[async_trait]
pub trait SchemaIntrospector: Send {
    fn engine(&self) -> EngineKind;

    /// Never fails: any error is logged and reported as `false`.
    async fn test_connection(&mut self) -> bool;

    /// Every base table visible to the configured credentials. Columns are
    /// only loaded when `with_columns` is set.
    async fn list_tables(&mut self, with_columns: bool)
        -> Result<Vec<TableSelection>, DbClientError>;

    /// Columns of a single table, in ordinal order.
    async fn describe_table(&mut self, table: &str) -> Result<Vec<ColumnSelection>, DbClientError>;

    /// Run `ddl` verbatim inside the table's schema. Fails with
    /// [`DbClientError::TableExists`] when the table is already there.
    async fn create_table(&mut self, table: &str, ddl: &str) -> Result<(), DbClientError>;

    /// Exact row count. Names outside the identifier grammar are rejected
    /// before any SQL reaches the engine.
    async fn count_rows(&mut self, table: &str) -> Result<u64, DbClientError>;

    async fn close(&mut self);
}

/// Engine dialect for catalog lookups. Implementations are pure SQL builders.
pub trait CatalogQueries: Send + Sync {
    const ENGINE: EngineKind;

    fn test_query(&self) -> &'static str {
        "SELECT 1"
    }

    fn tables(&self, config: &ConnectionConfig) -> CatalogQuery;

    /// Column rows aliased as `table_schema`, `table_name`, `column_name`,
    /// `data_type`, `is_nullable` and `is_primary_key`.
    fn columns(&self, config: &ConnectionConfig, table: Option<(&str, &str)>) -> CatalogQuery;

    fn table_exists(&self, schema: &str, table: &str) -> CatalogQuery;

    /// Statement switching the session into `schema` before DDL runs.
    fn ddl_prelude(&self, _schema: &str) -> Option<String> {
        None
    }

    fn count(&self, quoted_table: &str) -> String {
        format!("SELECT COUNT(*) AS cnt FROM {quoted_table}")
    }

    /// Schema an unqualified table name resolves to.
    fn schema_for(&self, config: &ConnectionConfig, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .unwrap_or_else(|| config.schema_or_default())
    }
}

/// Introspector shared by every engine; the dialect supplies the SQL.
pub struct CatalogIntrospector<Q: CatalogQueries> {
    config: ConnectionConfig,
    client: BoxedDbClient,
    queries: Q,
}

pub type PostgresIntrospector = CatalogIntrospector<PostgresCatalog>;
pub type MysqlIntrospector = CatalogIntrospector<MysqlCatalog>;
pub type MssqlIntrospector = CatalogIntrospector<MssqlCatalog>;
pub type OracleIntrospector = CatalogIntrospector<OracleCatalog>;

impl<Q: CatalogQueries> CatalogIntrospector<Q> {
    pub fn new(config: ConnectionConfig, client: BoxedDbClient, queries: Q) -> Self {
        Self {
            config,
            client,
            queries,
        }
    }

    async fn fetch(&mut self, (sql, params): CatalogQuery) -> Result<Vec<crate::Row>, DbClientError> {
        self.client.query(&sql, &params, QueryOptions::default()).await
    }
}

#[async_trait]
impl<Q: CatalogQueries> SchemaIntrospector for CatalogIntrospector<Q> {
    fn engine(&self) -> EngineKind {
        Q::ENGINE
    }

    async fn test_connection(&mut self) -> bool {
        match self
            .client
            .query(self.queries.test_query(), &[], QueryOptions::once())
            .await
        {
            Ok(_) => true,
            Err(e) => {
                warn!(engine = %Q::ENGINE, host = %self.config.host, "connection test failed: {e}");
                false
            }
        }
    }

    async fn list_tables(
        &mut self,
        with_columns: bool,
    ) -> Result<Vec<TableSelection>, DbClientError> {
        let query = self.queries.tables(&self.config);
        let rows = self.fetch(query).await?;
        let mut tables = tables_from_rows(&rows);

        if with_columns {
            let query = self.queries.columns(&self.config, None);
            let rows = self.fetch(query).await?;
            attach_columns(&mut tables, &rows);
        }
        debug!(engine = %Q::ENGINE, count = tables.len(), "listed tables");
        Ok(tables)
    }

    async fn describe_table(&mut self, table: &str) -> Result<Vec<ColumnSelection>, DbClientError> {
        let (schema, name) = split_qualified(table);
        let schema = self.queries.schema_for(&self.config, schema);
        let query = self.queries.columns(&self.config, Some((&schema, name)));
        let rows = self.fetch(query).await?;
        Ok(rows.iter().filter_map(column_from_row).collect())
    }

    async fn create_table(&mut self, table: &str, ddl: &str) -> Result<(), DbClientError> {
        let (schema, name) = split_qualified(table);
        let schema = self.queries.schema_for(&self.config, schema);

        let query = self.queries.table_exists(&schema, name);
        let existing = self.fetch(query).await?;
        if !existing.is_empty() {
            return Err(DbClientError::table_exists(format!("{schema}.{name}")));
        }

        if let Some(prelude) = self.queries.ddl_prelude(&schema) {
            self.client.execute(&prelude, &[]).await?;
        }
        self.client.execute(strip_trailing_semicolon(ddl), &[]).await?;
        info!(engine = %Q::ENGINE, table = %format!("{schema}.{name}"), "created table");
        Ok(())
    }

    async fn count_rows(&mut self, table: &str) -> Result<u64, DbClientError> {
        if !is_safe_table_name(table) {
            return Err(DbClientError::invalid_identifier(table));
        }
        let sql = self.queries.count(&quote_identifier(Q::ENGINE, table));
        let rows = self.client.query(&sql, &[], QueryOptions::default()).await?;
        let count = rows
            .first()
            .and_then(|row| row.get_i64("cnt"))
            .ok_or_else(|| DbClientError::statement(format!("no row count returned for {table}")))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn close(&mut self) {
        self.client.disconnect().await;
    }
}

/// Wrap an existing client in the introspector for its engine.
pub fn introspector_for(
    config: ConnectionConfig,
    client: BoxedDbClient,
) -> Box<dyn SchemaIntrospector> {
    match config.engine {
        EngineKind::Postgres => Box::new(PostgresIntrospector::new(config, client, PostgresCatalog)),
        EngineKind::Mysql => Box::new(MysqlIntrospector::new(config, client, MysqlCatalog)),
        EngineKind::Mssql => Box::new(MssqlIntrospector::new(config, client, MssqlCatalog)),
        EngineKind::Oracle => Box::new(OracleIntrospector::new(config, client, OracleCatalog)),
    }
}

pub fn create_introspector(config: &ConnectionConfig) -> Box<dyn SchemaIntrospector> {
    introspector_for(config.clone(), create_db_client(config))
}
