use serde::Serialize;
use serde_json::Value;

/// Positional query parameter, bound with each engine's native placeholder syntax.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<bool> for SqlParam {
    fn from(value: bool) -> Self {
        SqlParam::Bool(value)
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlParam::Null)
    }
}

/// Engine-neutral result row: ordered column names and JSON values.
///
/// Column lookup ignores case since Oracle upper-cases unquoted aliases and
/// SQL Server preserves whatever the catalog view declares.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let (columns, values) = pairs.into_iter().map(|(k, v)| (k.into(), v)).unzip();
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|idx| self.values.get(idx))
    }

    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(Value::as_str)
    }

    /// String form of the value, numbers and booleans included.
    pub fn get_string(&self, column: &str) -> Option<String> {
        match self.get(column)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    pub fn get_i64(&self, column: &str) -> Option<i64> {
        match self.get(column)? {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
            Value::String(s) => s.trim().parse().ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Accepts the many spellings engines use for flags: `true`, `1`, `YES`, `Y`.
    pub fn get_bool(&self, column: &str) -> Option<bool> {
        match self.get(column)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|v| v != 0),
            Value::String(s) => match s.trim().to_ascii_uppercase().as_str() {
                "TRUE" | "YES" | "Y" | "1" | "T" => Some(true),
                "FALSE" | "NO" | "N" | "0" | "F" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_is_case_insensitive() {
        let row = Row::from_pairs([("TABLE_NAME", json!("ORDERS")), ("cnt", json!(3))]);
        assert_eq!(row.get_str("table_name"), Some("ORDERS"));
        assert_eq!(row.get_i64("CNT"), Some(3));
        assert!(row.get("missing").is_none());
    }

    #[test]
    fn flags_accept_engine_spellings() {
        let row = Row::from_pairs([
            ("a", json!("YES")),
            ("b", json!(0)),
            ("c", json!(true)),
            ("d", json!("N")),
        ]);
        assert_eq!(row.get_bool("a"), Some(true));
        assert_eq!(row.get_bool("b"), Some(false));
        assert_eq!(row.get_bool("c"), Some(true));
        assert_eq!(row.get_bool("d"), Some(false));
    }

    #[test]
    fn params_serialize_plainly() {
        let params = vec![SqlParam::from("x"), SqlParam::Int(1), SqlParam::Null];
        assert_eq!(serde_json::to_string(&params).unwrap(), r#"["x",1,null]"#);
    }
}
