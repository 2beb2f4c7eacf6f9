use common::naming::capture_schema;
use common::types::{ConnectionConfig, EngineKind, TableSelection};

/// Name capture connectors use to qualify tables in their include lists.
/// MySQL has no schema level, so the database takes its place.
pub fn table_qualifier(conn: &ConnectionConfig) -> String {
    match conn.engine {
        EngineKind::Mysql => conn.database.clone(),
        EngineKind::Postgres | EngineKind::Mssql | EngineKind::Oracle => capture_schema(conn),
    }
}

pub fn table_include_list<'a>(
    qualifier: &str,
    tables: impl IntoIterator<Item = &'a TableSelection>,
) -> String {
    tables
        .into_iter()
        .map(|t| format!("{qualifier}.{}", t.name))
        .collect::<Vec<_>>()
        .join(",")
}

/// Column filter for the capture connector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnFilter {
    Include(String),
    Exclude(String),
    /// Nothing excluded; every column of every selected table is captured.
    All,
}

impl ColumnFilter {
    /// Emit whichever list is shorter: an include list when fewer columns are
    /// included than excluded, an exclude list otherwise.
    ///
    /// An include list applies to every captured table, so it is only used
    /// when each table names at least one included column. A table without
    /// column metadata is captured whole and forces the exclude side.
    ///
    /// An include list silently drops columns added to the source later, an
    /// exclude list silently picks them up.
    pub fn for_tables<'a>(
        qualifier: &str,
        tables: impl IntoIterator<Item = &'a TableSelection>,
    ) -> Self {
        let mut included = Vec::new();
        let mut excluded = Vec::new();
        let mut every_table_listed = true;
        for table in tables {
            let before = included.len();
            for column in &table.columns {
                let qualified = format!("{qualifier}.{}.{}", table.name, column.name);
                if column.included {
                    included.push(qualified);
                } else {
                    excluded.push(qualified);
                }
            }
            every_table_listed &= included.len() > before;
        }

        if every_table_listed && included.len() < excluded.len() {
            ColumnFilter::Include(included.join(","))
        } else if excluded.is_empty() {
            ColumnFilter::All
        } else {
            ColumnFilter::Exclude(excluded.join(","))
        }
    }

    pub fn include_list(&self) -> Option<String> {
        match self {
            ColumnFilter::Include(list) => Some(list.clone()),
            _ => None,
        }
    }

    pub fn exclude_list(&self) -> Option<String> {
        match self {
            ColumnFilter::Exclude(list) => Some(list.clone()),
            _ => None,
        }
    }
}

/// Lower-cased identifier safe for replication slot and publication names.
pub fn slot_safe(part: &str) -> String {
    part.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::ColumnSelection;

    fn table(included: usize, excluded: usize) -> TableSelection {
        let mut columns = Vec::new();
        for i in 0..included {
            columns.push(ColumnSelection::new(format!("in{i}"), "int"));
        }
        for i in 0..excluded {
            columns.push(ColumnSelection::new(format!("out{i}"), "int").excluded());
        }
        TableSelection::new("t").with_columns(columns)
    }

    #[test]
    fn shorter_list_wins() {
        assert_eq!(
            ColumnFilter::for_tables("dbo", [&table(1, 3)]),
            ColumnFilter::Include("dbo.t.in0".into())
        );
        assert_eq!(
            ColumnFilter::for_tables("dbo", [&table(3, 1)]),
            ColumnFilter::Exclude("dbo.t.out0".into())
        );
    }

    #[test]
    fn ties_and_full_selection_use_exclude_side() {
        assert_eq!(
            ColumnFilter::for_tables("s", [&table(1, 1)]),
            ColumnFilter::Exclude("s.t.out0".into())
        );
        assert_eq!(ColumnFilter::for_tables("s", [&table(4, 0)]), ColumnFilter::All);
        assert_eq!(ColumnFilter::for_tables("s", [&table(0, 0)]), ColumnFilter::All);
    }

    #[test]
    fn include_list_needs_columns_from_every_table() {
        let listed = table(1, 3);
        let bare = TableSelection::new("u");
        assert_eq!(
            ColumnFilter::for_tables("s", [&listed, &bare]),
            ColumnFilter::Exclude("s.t.out0,s.t.out1,s.t.out2".into())
        );
        assert_eq!(ColumnFilter::for_tables("s", [&bare]), ColumnFilter::All);
    }

    #[test]
    fn slot_names_are_sanitized() {
        assert_eq!(slot_safe("Shop-DB.9f3a"), "shop_db_9f3a");
    }
}
