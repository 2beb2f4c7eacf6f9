use serde::{ser::SerializeMap, Serialize, Serializer};
use std::borrow::Cow;

/* ====================== Predicates ====================== */

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateKind {
    /// Matches topic names via regex: `predicates.<name>.pattern`
    TopicNameMatches { pattern: String },
}

impl PredicateKind {
    fn class_name(&self) -> Cow<'static, str> {
        match self {
            PredicateKind::TopicNameMatches { .. } => {
                Cow::Borrowed("org.apache.kafka.connect.transforms.predicates.TopicNameMatches")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub name: String,
    pub kind: PredicateKind,
}

impl Predicate {
    /// Predicate true only for the topic named exactly `topic`.
    pub fn topic_is(name: impl Into<String>, topic: &str) -> Self {
        Self {
            name: name.into(),
            kind: PredicateKind::TopicNameMatches {
                pattern: regex::escape(topic),
            },
        }
    }
}

/// A list of predicates that serializes to flat Kafka Connect keys
#[derive(Debug, Clone, Default)]
pub struct Predicates(pub Vec<Predicate>);

impl Predicates {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Predicates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        let names = self
            .0
            .iter()
            .map(|p| p.name.as_str())
            .collect::<Vec<_>>()
            .join(",");
        map.serialize_entry("predicates", &names)?;

        for p in &self.0 {
            let prefix = format!("predicates.{}.", p.name);
            map.serialize_entry(&(prefix.clone() + "type"), &p.kind.class_name())?;

            match &p.kind {
                PredicateKind::TopicNameMatches { pattern } => {
                    map.serialize_entry(&(prefix.clone() + "pattern"), pattern)?;
                }
            }
        }

        map.end()
    }
}

/* ====================== Referencing predicates from SMTs ====================== */

/// Reference a declared predicate from an SMT, with optional negation.
#[derive(Debug, Clone, PartialEq)]
pub struct PredicateRef {
    pub name: String,
    pub negate: Option<bool>,
}

impl PredicateRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            negate: None,
        }
    }

    pub(crate) fn write_flat<M: SerializeMap>(&self, map: &mut M, smt_prefix: &str) -> Result<(), M::Error> {
        map.serialize_entry(&format!("{smt_prefix}predicate"), &self.name)?;
        if let Some(neg) = self.negate {
            map.serialize_entry(&format!("{smt_prefix}negate"), &neg.to_string())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn predicates_flatten_to_connect_keys() {
        let preds = Predicates(vec![
            Predicate::topic_is("isTopic0", "orders.v2"),
            Predicate::topic_is("isTopic1", "customers"),
        ]);
        let value = serde_json::to_value(&preds).unwrap();
        assert_eq!(value["predicates"], json!("isTopic0,isTopic1"));
        assert_eq!(value["predicates.isTopic0.pattern"], json!(r"orders\.v2"));
        assert_eq!(
            value["predicates.isTopic1.type"],
            json!("org.apache.kafka.connect.transforms.predicates.TopicNameMatches")
        );
    }
}
