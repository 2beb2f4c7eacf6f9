//! Stateless helpers shared by the per-engine introspectors.

use crate::Row;
use common::types::{ColumnSelection, EngineKind, TableSelection};
use once_cell::sync::Lazy;
use regex::Regex;

static SAFE_TABLE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^[\w.\[\]"`]+$"#).expect("identifier grammar compiles"));

/// Conservative identifier grammar: word characters, dots, brackets and quotes.
pub fn is_safe_table_name(name: &str) -> bool {
    SAFE_TABLE_NAME.is_match(name)
}

fn strip_quotes(part: &str) -> &str {
    part.trim_matches(|c| matches!(c, '"' | '`' | '[' | ']'))
}

/// Quote a possibly schema-qualified name in the engine's identifier syntax.
/// Existing quoting is stripped first so the call is idempotent.
///
/// Oracle folds unquoted parts to upper case; parts that arrive double-quoted
/// keep their case.
pub fn quote_identifier(engine: EngineKind, name: &str) -> String {
    name.split('.')
        .map(|raw| match engine {
            EngineKind::Postgres => format!("\"{}\"", strip_quotes(raw).replace('"', "\"\"")),
            EngineKind::Mysql => format!("`{}`", strip_quotes(raw).replace('`', "``")),
            EngineKind::Mssql => format!("[{}]", strip_quotes(raw).replace(']', "]]")),
            EngineKind::Oracle => {
                let quoted = raw.len() > 1 && raw.starts_with('"') && raw.ends_with('"');
                let part = strip_quotes(raw);
                let part = if quoted {
                    part.to_string()
                } else {
                    part.to_ascii_uppercase()
                };
                format!("\"{}\"", part.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

pub fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}

pub fn strip_trailing_semicolon(sql: &str) -> &str {
    sql.trim_end().trim_end_matches(';').trim_end()
}

/// Split `schema.table` into its parts. An unqualified name yields `None`
/// for the schema.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once('.') {
        Some((schema, table)) => (Some(strip_quotes(schema)), strip_quotes(table)),
        None => (None, strip_quotes(name)),
    }
}

pub fn column_from_row(row: &Row) -> Option<ColumnSelection> {
    let name = row.get_string("column_name")?;
    let data_type = row.get_string("data_type").unwrap_or_default();
    Some(ColumnSelection {
        name,
        data_type,
        primary_key: row.get_bool("is_primary_key").unwrap_or(false),
        included: true,
        nullable: row.get_bool("is_nullable").unwrap_or(true),
    })
}

pub fn tables_from_rows(rows: &[Row]) -> Vec<TableSelection> {
    rows.iter()
        .filter_map(|row| {
            let name = row.get_string("table_name")?;
            let mut table = TableSelection::new(name);
            table.schema = row.get_string("table_schema");
            Some(table)
        })
        .collect()
}

/// Distribute column rows (carrying `table_schema` and `table_name`) onto the
/// matching tables, preserving the row order within each table.
pub fn attach_columns(tables: &mut [TableSelection], rows: &[Row]) {
    for row in rows {
        let (Some(table_name), Some(column)) = (row.get_string("table_name"), column_from_row(row))
        else {
            continue;
        };
        let schema = row.get_string("table_schema");
        if let Some(table) = tables
            .iter_mut()
            .find(|t| t.name == table_name && (schema.is_none() || t.schema == schema))
        {
            table.columns.push(column);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_injection_attempts() {
        assert!(is_safe_table_name("dbo.orders"));
        assert!(is_safe_table_name("[dbo].[order_lines]"));
        assert!(is_safe_table_name("\"public\".\"Orders\""));
        assert!(!is_safe_table_name("DROP TABLE x; --"));
        assert!(!is_safe_table_name("orders where 1=1"));
        assert!(!is_safe_table_name(""));
    }

    #[test]
    fn quotes_per_engine() {
        assert_eq!(quote_identifier(EngineKind::Postgres, "public.orders"), "\"public\".\"orders\"");
        assert_eq!(quote_identifier(EngineKind::Mysql, "shop.orders"), "`shop`.`orders`");
        assert_eq!(quote_identifier(EngineKind::Mssql, "[dbo].orders"), "[dbo].[orders]");
        assert_eq!(quote_identifier(EngineKind::Oracle, "app.orders"), "\"APP\".\"ORDERS\"");
        assert_eq!(
            quote_identifier(EngineKind::Oracle, "app.\"OrderLines\""),
            "\"APP\".\"OrderLines\""
        );
    }

    #[test]
    fn trims_statement_terminators() {
        assert_eq!(strip_trailing_semicolon("CREATE TABLE t (id int);  "), "CREATE TABLE t (id int)");
        assert_eq!(escape_literal("o'brien"), "o''brien");
    }

    #[test]
    fn groups_columns_under_tables() {
        let table_rows = vec![
            Row::from_pairs([("table_schema", json!("public")), ("table_name", json!("orders"))]),
            Row::from_pairs([("table_schema", json!("public")), ("table_name", json!("items"))]),
        ];
        let column_rows = vec![
            Row::from_pairs([
                ("table_schema", json!("public")),
                ("table_name", json!("orders")),
                ("column_name", json!("id")),
                ("data_type", json!("integer")),
                ("is_nullable", json!("NO")),
                ("is_primary_key", json!(true)),
            ]),
            Row::from_pairs([
                ("table_schema", json!("public")),
                ("table_name", json!("orders")),
                ("column_name", json!("note")),
                ("data_type", json!("text")),
                ("is_nullable", json!("YES")),
                ("is_primary_key", json!(false)),
            ]),
        ];
        let mut tables = tables_from_rows(&table_rows);
        attach_columns(&mut tables, &column_rows);

        assert_eq!(tables[0].columns.len(), 2);
        assert!(tables[0].columns[0].primary_key);
        assert!(!tables[0].columns[0].nullable);
        assert!(tables[1].columns.is_empty());
    }
}
