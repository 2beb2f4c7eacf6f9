use crate::introspect::helpers::quote_identifier;
use crate::introspect::{CatalogQueries, CatalogQuery};
use crate::SqlParam;
use common::types::{ConnectionConfig, EngineKind};

/// Oracle stores unquoted identifiers upper-cased; owners are compared that way.
#[derive(Debug, Clone, Copy, Default)]
pub struct OracleCatalog;

impl CatalogQueries for OracleCatalog {
    const ENGINE: EngineKind = EngineKind::Oracle;

    fn test_query(&self) -> &'static str {
        "SELECT 1 FROM DUAL"
    }

    fn tables(&self, config: &ConnectionConfig) -> CatalogQuery {
        (
            "SELECT owner AS table_schema, table_name AS table_name \
             FROM all_tables WHERE owner = :1 ORDER BY table_name"
                .to_string(),
            vec![SqlParam::from(self.schema_for(config, None))],
        )
    }

    fn columns(&self, config: &ConnectionConfig, table: Option<(&str, &str)>) -> CatalogQuery {
        let mut sql = String::from(
            "SELECT c.owner AS table_schema, c.table_name AS table_name, \
                    c.column_name AS column_name, c.data_type AS data_type, \
                    c.nullable AS is_nullable, \
                    CASE WHEN EXISTS ( \
                        SELECT 1 FROM all_constraints ac \
                        JOIN all_cons_columns acc \
                          ON ac.owner = acc.owner AND ac.constraint_name = acc.constraint_name \
                        WHERE ac.constraint_type = 'P' \
                          AND ac.owner = c.owner \
                          AND ac.table_name = c.table_name \
                          AND acc.column_name = c.column_name \
                    ) THEN 1 ELSE 0 END AS is_primary_key \
             FROM all_tab_columns c WHERE c.owner = :1",
        );
        let params = match table {
            Some((schema, name)) => {
                sql.push_str(" AND c.table_name = UPPER(:2)");
                vec![
                    SqlParam::from(schema.to_ascii_uppercase()),
                    SqlParam::from(name),
                ]
            }
            None => vec![SqlParam::from(self.schema_for(config, None))],
        };
        sql.push_str(" ORDER BY c.table_name, c.column_id");
        (sql, params)
    }

    fn table_exists(&self, schema: &str, table: &str) -> CatalogQuery {
        (
            "SELECT 1 AS present FROM all_tables \
             WHERE owner = UPPER(:1) AND table_name = UPPER(:2)"
                .to_string(),
            vec![SqlParam::from(schema), SqlParam::from(table)],
        )
    }

    fn ddl_prelude(&self, schema: &str) -> Option<String> {
        Some(format!(
            "ALTER SESSION SET CURRENT_SCHEMA = {}",
            quote_identifier(Self::ENGINE, schema)
        ))
    }

    fn schema_for(&self, config: &ConnectionConfig, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .unwrap_or_else(|| config.schema_or_default())
            .to_ascii_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owner_is_upper_cased() {
        let cfg = ConnectionConfig::new(EngineKind::Oracle, "ora", 1521, "app", "p", "ORCLPDB1");
        let (_, params) = OracleCatalog.tables(&cfg);
        assert_eq!(params, vec![SqlParam::from("APP")]);
        assert_eq!(
            OracleCatalog.ddl_prelude("app").as_deref(),
            Some("ALTER SESSION SET CURRENT_SCHEMA = \"APP\"")
        );
        assert_eq!(OracleCatalog.test_query(), "SELECT 1 FROM DUAL");
    }
}
