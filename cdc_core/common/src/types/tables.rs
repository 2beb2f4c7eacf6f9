use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSelection {
    pub name: String,
    pub data_type: String,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default = "default_true")]
    pub included: bool,
    #[serde(default = "default_true")]
    pub nullable: bool,
}

impl ColumnSelection {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            primary_key: false,
            included: true,
            nullable: true,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn excluded(mut self) -> Self {
        self.included = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRename {
    pub source: String,
    pub target: String,
}

impl ColumnRename {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// One table of a pipeline, on either the source or the target side.
///
/// Column inclusion and column renaming are independent: an included column may
/// still be renamed, an excluded one simply never reaches the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSelection {
    pub name: String,
    /// Catalog qualification reported by introspection, if the engine has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renamed_from: Option<String>,
    #[serde(default = "default_true")]
    pub selected: bool,
    #[serde(default)]
    pub columns: Vec<ColumnSelection>,
    #[serde(default)]
    pub column_renames: Vec<ColumnRename>,
}

impl TableSelection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            renamed_from: None,
            selected: true,
            columns: Vec::new(),
            column_renames: Vec::new(),
        }
    }

    pub fn with_columns(mut self, columns: Vec<ColumnSelection>) -> Self {
        self.columns = columns;
        self
    }

    pub fn renamed_from(mut self, source: impl Into<String>) -> Self {
        self.renamed_from = Some(source.into());
        self
    }

    pub fn with_rename(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.column_renames.push(ColumnRename::new(source, target));
        self
    }

    pub fn deselected(mut self) -> Self {
        self.selected = false;
        self
    }

    /// Name of the table on the capture side.
    pub fn source_name(&self) -> &str {
        self.renamed_from.as_deref().unwrap_or(&self.name)
    }

    pub fn is_renamed(&self) -> bool {
        self.renamed_from
            .as_deref()
            .is_some_and(|source| source != self.name)
    }

    /// Rename pairs that actually change a name.
    pub fn effective_renames(&self) -> impl Iterator<Item = &ColumnRename> {
        self.column_renames.iter().filter(|r| r.source != r.target)
    }

    pub fn primary_key_columns(&self) -> impl Iterator<Item = &ColumnSelection> {
        self.columns.iter().filter(|c| c.primary_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_name_falls_back_to_name() {
        let plain = TableSelection::new("orders");
        let renamed = TableSelection::new("orders_v2").renamed_from("orders");
        assert_eq!(plain.source_name(), "orders");
        assert!(!plain.is_renamed());
        assert_eq!(renamed.source_name(), "orders");
        assert!(renamed.is_renamed());
    }

    #[test]
    fn identity_renames_are_ignored() {
        let table = TableSelection::new("orders")
            .with_rename("id", "id")
            .with_rename("order_date", "placed_at");
        let renames: Vec<_> = table.effective_renames().collect();
        assert_eq!(renames.len(), 1);
        assert_eq!(renames[0].target, "placed_at");
    }

    #[test]
    fn missing_flags_default_to_selected() {
        let table: TableSelection =
            serde_json::from_str(r#"{"name":"t","columns":[{"name":"a","data_type":"int"}]}"#)
                .unwrap();
        assert!(table.selected);
        assert!(table.columns[0].included);
    }
}
