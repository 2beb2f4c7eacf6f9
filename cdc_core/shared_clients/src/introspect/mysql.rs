use crate::introspect::{CatalogQueries, CatalogQuery};
use crate::SqlParam;
use common::types::{ConnectionConfig, EngineKind};

/// MySQL has no schema level below the database, so the configured database
/// doubles as the schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlCatalog;

impl CatalogQueries for MysqlCatalog {
    const ENGINE: EngineKind = EngineKind::Mysql;

    fn tables(&self, config: &ConnectionConfig) -> CatalogQuery {
        (
            "SELECT table_schema AS table_schema, table_name AS table_name \
             FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE' AND table_schema = ? \
             ORDER BY table_name"
                .to_string(),
            vec![SqlParam::from(config.database.as_str())],
        )
    }

    fn columns(&self, config: &ConnectionConfig, table: Option<(&str, &str)>) -> CatalogQuery {
        let mut sql = String::from(
            "SELECT c.table_schema AS table_schema, c.table_name AS table_name, \
                    c.column_name AS column_name, c.column_type AS data_type, \
                    c.is_nullable AS is_nullable, \
                    EXISTS ( \
                        SELECT 1 FROM information_schema.key_column_usage k \
                        WHERE k.constraint_name = 'PRIMARY' \
                          AND k.table_schema = c.table_schema \
                          AND k.table_name = c.table_name \
                          AND k.column_name = c.column_name \
                    ) AS is_primary_key \
             FROM information_schema.columns c \
             WHERE c.table_schema = ?",
        );
        let mut params = vec![SqlParam::from(config.database.as_str())];
        if let Some((_, name)) = table {
            sql.push_str(" AND c.table_name = ?");
            params.push(SqlParam::from(name));
        }
        sql.push_str(" ORDER BY c.table_name, c.ordinal_position");
        (sql, params)
    }

    fn table_exists(&self, schema: &str, table: &str) -> CatalogQuery {
        (
            "SELECT 1 AS present FROM information_schema.tables \
             WHERE table_schema = ? AND table_name = ?"
                .to_string(),
            vec![SqlParam::from(schema), SqlParam::from(table)],
        )
    }
}
