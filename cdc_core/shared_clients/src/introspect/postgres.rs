use crate::introspect::helpers::quote_identifier;
use crate::introspect::{CatalogQueries, CatalogQuery};
use crate::SqlParam;
use common::types::{ConnectionConfig, EngineKind};

const SYSTEM_SCHEMAS: &str = "('pg_catalog', 'information_schema')";

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresCatalog;

impl CatalogQueries for PostgresCatalog {
    const ENGINE: EngineKind = EngineKind::Postgres;

    fn tables(&self, _config: &ConnectionConfig) -> CatalogQuery {
        let sql = format!(
            "SELECT table_schema::text AS table_schema, table_name::text AS table_name \
             FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE' AND table_schema NOT IN {SYSTEM_SCHEMAS} \
             ORDER BY table_schema, table_name"
        );
        (sql, Vec::new())
    }

    fn columns(&self, _config: &ConnectionConfig, table: Option<(&str, &str)>) -> CatalogQuery {
        let mut sql = format!(
            "SELECT c.table_schema::text AS table_schema, c.table_name::text AS table_name, \
                    c.column_name::text AS column_name, c.data_type::text AS data_type, \
                    c.is_nullable::text AS is_nullable, \
                    EXISTS ( \
                        SELECT 1 FROM information_schema.table_constraints tc \
                        JOIN information_schema.key_column_usage k \
                          ON tc.constraint_name = k.constraint_name \
                         AND tc.table_schema = k.table_schema \
                         AND tc.table_name = k.table_name \
                        WHERE tc.constraint_type = 'PRIMARY KEY' \
                          AND k.table_schema = c.table_schema \
                          AND k.table_name = c.table_name \
                          AND k.column_name = c.column_name \
                    ) AS is_primary_key \
             FROM information_schema.columns c \
             WHERE c.table_schema NOT IN {SYSTEM_SCHEMAS}"
        );
        let mut params = Vec::new();
        if let Some((schema, name)) = table {
            sql.push_str(" AND c.table_schema::text = $1 AND c.table_name::text = $2");
            params = vec![SqlParam::from(schema), SqlParam::from(name)];
        }
        sql.push_str(" ORDER BY c.table_schema, c.table_name, c.ordinal_position");
        (sql, params)
    }

    fn table_exists(&self, schema: &str, table: &str) -> CatalogQuery {
        (
            "SELECT 1 AS present FROM information_schema.tables \
             WHERE table_schema::text = $1 AND table_name::text = $2"
                .to_string(),
            vec![SqlParam::from(schema), SqlParam::from(table)],
        )
    }

    fn ddl_prelude(&self, schema: &str) -> Option<String> {
        Some(format!(
            "SET search_path TO {}",
            quote_identifier(Self::ENGINE, schema)
        ))
    }

    fn count(&self, quoted_table: &str) -> String {
        format!("SELECT COUNT(*)::bigint AS cnt FROM {quoted_table}")
    }
}
