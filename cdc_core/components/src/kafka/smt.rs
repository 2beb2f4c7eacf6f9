use crate::kafka::predicates::{Predicate, PredicateRef, Predicates};
use common::error::DiagnosticMessage;
use common::types::ColumnRename;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::borrow::Cow;
use thiserror::Error;

pub const RENAME_TOPIC: &str = "RenameTopic";
pub const UNWRAP: &str = "unwrap";

#[derive(Debug, Clone, PartialEq)]
pub enum SmtKind {
    RegexRouter {
        regex: String,
        replacement: String,
    },
    ReplaceFieldValue {
        renames: Vec<(String, String)>,
    },
    ExtractNewRecordState {
        drop_tombstones: Option<bool>,
        delete_handling_mode: Option<String>,
        add_fields: Option<String>,
    },
}

impl SmtKind {
    fn class_name(&self) -> Cow<'_, str> {
        match self {
            SmtKind::RegexRouter { .. } => {
                Cow::Borrowed("org.apache.kafka.connect.transforms.RegexRouter")
            }
            SmtKind::ReplaceFieldValue { .. } => {
                Cow::Borrowed("org.apache.kafka.connect.transforms.ReplaceField$Value")
            }
            SmtKind::ExtractNewRecordState { .. } => {
                Cow::Borrowed("io.debezium.transforms.ExtractNewRecordState")
            }
        }
    }
}

/* ---------- One transform = name + kind ---------- */
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub name: String,
    pub kind: SmtKind,
    pub predicate: Option<PredicateRef>,
}

#[derive(Debug, Error)]
pub enum TransformBuildError {
    #[error("Invalid value: {context}")]
    InvalidValue { context: DiagnosticMessage },
}

impl TransformBuildError {
    #[track_caller]
    pub fn invalid_value(key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        Self::InvalidValue {
            context: DiagnosticMessage::new(format!("value is invalid for {} key {}", value, key)),
        }
    }
}

/* ---------- A list of transforms ---------- */
#[derive(Debug, Clone, Default)]
pub struct Transforms(pub Vec<Transform>);

impl Transforms {
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|t| t.name.as_str()).collect()
    }
}

/* ---------- Serialize Transforms into flat Kafka Connect keys ---------- */
impl Serialize for Transforms {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        // transforms: "RenameTopic,unwrap"
        // transforms.RenameTopic.type: "..."
        // transforms.RenameTopic.<prop>: "..."
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("transforms", &self.names().join(","))?;

        for t in &self.0 {
            let prefix = format!("transforms.{}.", t.name);
            map.serialize_entry(&(prefix.clone() + "type"), &t.kind.class_name())?;

            match &t.kind {
                SmtKind::RegexRouter { regex, replacement } => {
                    map.serialize_entry(&(prefix.clone() + "regex"), regex)?;
                    map.serialize_entry(&(prefix.clone() + "replacement"), replacement)?;
                }
                SmtKind::ReplaceFieldValue { renames } => {
                    let joined = renames
                        .iter()
                        .map(|(from, to)| format!("{from}:{to}"))
                        .collect::<Vec<_>>()
                        .join(",");
                    map.serialize_entry(&(prefix.clone() + "renames"), &joined)?;
                }
                SmtKind::ExtractNewRecordState {
                    drop_tombstones,
                    delete_handling_mode,
                    add_fields,
                } => {
                    if let Some(v) = drop_tombstones {
                        map.serialize_entry(&(prefix.clone() + "drop.tombstones"), &v.to_string())?;
                    }
                    if let Some(v) = delete_handling_mode {
                        map.serialize_entry(&(prefix.clone() + "delete.handling.mode"), v)?;
                    }
                    if let Some(v) = add_fields {
                        map.serialize_entry(&(prefix.clone() + "add.fields"), v)?;
                    }
                }
            }

            if let Some(pred) = &t.predicate {
                pred.write_flat(&mut map, &prefix)?;
            }
        }

        map.end()
    }
}

/// Builds the apply-side rename chain.
///
/// The chain always starts with [`RENAME_TOPIC`] and ends with [`UNWRAP`];
/// table and field renames are appended in between in call order, each kind
/// with its own counter.
#[derive(Debug)]
pub struct SmtChain {
    transforms: Vec<Transform>,
    predicates: Vec<Predicate>,
    table_renames: usize,
    field_renames: usize,
}

impl SmtChain {
    /// `strip_regex` must capture the bare table name in group 1.
    pub fn new(strip_regex: impl Into<String>) -> Self {
        Self {
            transforms: vec![Transform {
                name: RENAME_TOPIC.to_string(),
                kind: SmtKind::RegexRouter {
                    regex: strip_regex.into(),
                    replacement: "$1".to_string(),
                },
                predicate: None,
            }],
            predicates: Vec::new(),
            table_renames: 0,
            field_renames: 0,
        }
    }

    /// Route records of topic `from` (exact name) to `to`. Steps run in call
    /// order, so a later step whose `from` equals this `to` would re-route
    /// these records too.
    pub fn rename_table(&mut self, from: &str, to: &str) {
        let name = format!("renameTable{}", self.table_renames);
        self.table_renames += 1;
        self.transforms.push(Transform {
            name,
            kind: SmtKind::RegexRouter {
                regex: format!("^{}$", regex::escape(from)),
                replacement: to.to_string(),
            },
            predicate: None,
        });
    }

    /// Rename value fields, only on records of `topic`. Pairs that do not
    /// change the name are skipped; nothing is added when none remain.
    pub fn rename_fields<'a>(
        &mut self,
        topic: &str,
        renames: impl IntoIterator<Item = &'a ColumnRename>,
    ) -> Result<(), TransformBuildError> {
        let mut pairs = Vec::new();
        for rename in renames {
            if rename.source == rename.target {
                continue;
            }
            for part in [&rename.source, &rename.target] {
                if part.is_empty() || part.contains([':', ',']) {
                    return Err(TransformBuildError::invalid_value("renames", part.as_str()));
                }
            }
            pairs.push((rename.source.clone(), rename.target.clone()));
        }
        if pairs.is_empty() {
            return Ok(());
        }

        let index = self.field_renames;
        self.field_renames += 1;
        let predicate = format!("isTopic{index}");
        self.predicates.push(Predicate::topic_is(predicate.clone(), topic));
        self.transforms.push(Transform {
            name: format!("replaceFields{index}"),
            kind: SmtKind::ReplaceFieldValue { renames: pairs },
            predicate: Some(PredicateRef::new(predicate)),
        });
        Ok(())
    }

    pub fn finish(mut self) -> (Transforms, Predicates) {
        self.transforms.push(Transform {
            name: UNWRAP.to_string(),
            kind: SmtKind::ExtractNewRecordState {
                drop_tombstones: Some(false),
                delete_handling_mode: Some("rewrite".to_string()),
                add_fields: Some("op,table".to_string()),
            },
            predicate: None,
        });
        (Transforms(self.transforms), Predicates(self.predicates))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn chain_is_bracketed_by_topic_rename_and_unwrap() {
        let (transforms, predicates) = SmtChain::new(r"^h\.db\.(.*)$").finish();
        assert_eq!(transforms.names(), vec![RENAME_TOPIC, UNWRAP]);
        assert!(predicates.is_empty());

        let value = serde_json::to_value(&transforms).unwrap();
        assert_eq!(value["transforms"], json!("RenameTopic,unwrap"));
        assert_eq!(value["transforms.RenameTopic.replacement"], json!("$1"));
        assert_eq!(value["transforms.unwrap.drop.tombstones"], json!("false"));
        assert_eq!(value["transforms.unwrap.add.fields"], json!("op,table"));
    }

    #[test]
    fn counters_are_per_step_kind() {
        let mut chain = SmtChain::new("^(.*)$");
        chain.rename_table("orders_src", "orders");
        chain
            .rename_fields("orders", &[ColumnRename::new("a", "b")])
            .unwrap();
        chain.rename_table("items_src", "items");
        let (transforms, predicates) = chain.finish();

        assert_eq!(
            transforms.names(),
            vec!["RenameTopic", "renameTable0", "replaceFields0", "renameTable1", "unwrap"]
        );
        assert_eq!(predicates.0.len(), 1);
        let value = serde_json::to_value(&transforms).unwrap();
        assert_eq!(value["transforms.renameTable0.regex"], json!("^orders_src$"));
        assert_eq!(value["transforms.replaceFields0.predicate"], json!("isTopic0"));
    }

    #[test]
    fn identity_renames_add_nothing() {
        let mut chain = SmtChain::new("^(.*)$");
        chain
            .rename_fields("orders", &[ColumnRename::new("id", "id")])
            .unwrap();
        assert_eq!(chain.finish().0.names(), vec![RENAME_TOPIC, UNWRAP]);
    }

    #[test]
    fn separators_in_column_names_are_rejected() {
        let mut chain = SmtChain::new("^(.*)$");
        let err = chain
            .rename_fields("orders", &[ColumnRename::new("a:b", "c")])
            .unwrap_err();
        assert!(err.to_string().contains("a:b"));
    }
}
