use crate::introspect::{CatalogQueries, CatalogQuery};
use crate::SqlParam;
use common::types::{ConnectionConfig, EngineKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct MssqlCatalog;

impl CatalogQueries for MssqlCatalog {
    const ENGINE: EngineKind = EngineKind::Mssql;

    fn tables(&self, _config: &ConnectionConfig) -> CatalogQuery {
        (
            "SELECT TABLE_SCHEMA AS table_schema, TABLE_NAME AS table_name \
             FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_SCHEMA NOT IN ('cdc', 'sys') \
             ORDER BY TABLE_SCHEMA, TABLE_NAME"
                .to_string(),
            Vec::new(),
        )
    }

    fn columns(&self, _config: &ConnectionConfig, table: Option<(&str, &str)>) -> CatalogQuery {
        let mut sql = String::from(
            "SELECT c.TABLE_SCHEMA AS table_schema, c.TABLE_NAME AS table_name, \
                    c.COLUMN_NAME AS column_name, c.DATA_TYPE AS data_type, \
                    c.IS_NULLABLE AS is_nullable, \
                    CASE WHEN EXISTS ( \
                        SELECT 1 FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc \
                        JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE k \
                          ON tc.CONSTRAINT_NAME = k.CONSTRAINT_NAME \
                         AND tc.TABLE_SCHEMA = k.TABLE_SCHEMA \
                        WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY' \
                          AND k.TABLE_SCHEMA = c.TABLE_SCHEMA \
                          AND k.TABLE_NAME = c.TABLE_NAME \
                          AND k.COLUMN_NAME = c.COLUMN_NAME \
                    ) THEN 1 ELSE 0 END AS is_primary_key \
             FROM INFORMATION_SCHEMA.COLUMNS c \
             WHERE c.TABLE_SCHEMA NOT IN ('cdc', 'sys')",
        );
        let mut params = Vec::new();
        if let Some((schema, name)) = table {
            sql.push_str(" AND c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2");
            params = vec![SqlParam::from(schema), SqlParam::from(name)];
        }
        sql.push_str(" ORDER BY c.TABLE_SCHEMA, c.TABLE_NAME, c.ORDINAL_POSITION");
        (sql, params)
    }

    fn table_exists(&self, schema: &str, table: &str) -> CatalogQuery {
        (
            "SELECT 1 AS present FROM INFORMATION_SCHEMA.TABLES \
             WHERE TABLE_SCHEMA = @P1 AND TABLE_NAME = @P2"
                .to_string(),
            vec![SqlParam::from(schema), SqlParam::from(table)],
        )
    }

    fn count(&self, quoted_table: &str) -> String {
        format!("SELECT COUNT_BIG(*) AS cnt FROM {quoted_table}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_tds_placeholders() {
        let (sql, _) = MssqlCatalog.table_exists("dbo", "orders");
        assert!(sql.contains("@P1") && sql.contains("@P2"));
        assert_eq!(MssqlCatalog.count("[dbo].[orders]"), "SELECT COUNT_BIG(*) AS cnt FROM [dbo].[orders]");
    }
}
