//! Criteria objects and their compiler.
//!
//! A criteria object maps predicate keys (`"age >="`, `"tags @>"`,
//! `"meta.color"`) to values, with `or`/`and` holding arrays of nested
//! criteria objects:
//!
//! ```rust
//! use pgcriteria::criteria::where_clause;
//! use serde_json::json;
//!
//! let w = where_clause(&json!({
//!     "status": "active",
//!     "or": [{"age <": 18}, {"age between": [65, 120]}],
//! }))?;
//!
//! assert_eq!(
//!     w.conditions,
//!     r#""status" = $1 AND (("age" < $2) OR ("age" BETWEEN $3 AND $4))"#
//! );
//! assert_eq!(w.params.len(), 4);
//! # Ok::<(), pgcriteria::SqlError>(())
//! ```
//!
//! The pipeline per key is [`key::parse_key`] → [`ops::resolve`] →
//! a generator ([`generator::table_generator`] / [`generator::doc_generator`])
//! which may run a [`mutators`] function.

pub mod condition;
pub mod generator;
pub mod key;
pub mod mutators;
pub mod ops;
mod where_clause;

pub use condition::Condition;
pub use generator::Generator;
pub use key::{ParsedKey, PathToken, parse_key};
pub use ops::{OPERATIONS, Operation, resolve};
pub use where_clause::{WhereClause, compile_where, compile_where_for, where_clause};

use crate::error::{SqlError, SqlResult};
use serde_json::{Map, Value};

/// One entry of a criteria object.
#[derive(Debug, Clone, PartialEq)]
pub enum CriteriaItem {
    /// `"<field expression> [operator]": value`
    Predicate { key: String, value: Value },
    /// Disjunction of nested conjunctions.
    Or(Vec<Criteria>),
    /// Conjunction of nested conjunctions.
    And(Vec<Criteria>),
}

/// A parsed criteria object. Items keep the key order of the source object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    pub items: Vec<CriteriaItem>,
}

impl Criteria {
    /// Parse a criteria value: an object, the wildcard `"*"`, or `null`
    /// (the last two match everything).
    pub fn parse(value: &Value) -> SqlResult<Self> {
        match value {
            Value::Null => Ok(Self::default()),
            Value::String(s) if s == "*" => Ok(Self::default()),
            Value::Object(map) => Self::from_map(map),
            other => Err(SqlError::invalid(format!(
                "criteria must be an object or \"*\", got {other}"
            ))),
        }
    }

    pub fn from_map(map: &Map<String, Value>) -> SqlResult<Self> {
        let mut items = Vec::with_capacity(map.len());
        for (key, value) in map {
            let item = match key.as_str() {
                "or" => CriteriaItem::Or(Self::parse_group(key, value)?),
                "and" => CriteriaItem::And(Self::parse_group(key, value)?),
                _ => CriteriaItem::Predicate {
                    key: key.clone(),
                    value: value.clone(),
                },
            };
            items.push(item);
        }
        Ok(Self { items })
    }

    fn parse_group(key: &str, value: &Value) -> SqlResult<Vec<Self>> {
        match value {
            Value::Array(branches) => branches
                .iter()
                .map(|branch| match branch {
                    Value::Object(map) => Self::from_map(map),
                    other => Err(SqlError::invalid(format!(
                        "'{key}' branches must be objects, got {other}"
                    ))),
                })
                .collect(),
            Value::Object(map) => Ok(vec![Self::from_map(map)?]),
            other => Err(SqlError::invalid(format!(
                "'{key}' must be an array of criteria objects, got {other}"
            ))),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Rebuild the JSON object this criteria was parsed from.
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.items.len());
        for item in &self.items {
            match item {
                CriteriaItem::Predicate { key, value } => {
                    map.insert(key.clone(), value.clone());
                }
                CriteriaItem::Or(groups) => {
                    map.insert("or".to_string(), groups.iter().map(Self::to_json).collect());
                }
                CriteriaItem::And(groups) => {
                    map.insert("and".to_string(), groups.iter().map(Self::to_json).collect());
                }
            }
        }
        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wildcard_and_null_are_empty() {
        assert!(Criteria::parse(&json!("*")).unwrap().is_empty());
        assert!(Criteria::parse(&Value::Null).unwrap().is_empty());
        assert!(Criteria::parse(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn scalars_are_rejected() {
        assert!(Criteria::parse(&json!(5)).is_err());
        assert!(Criteria::parse(&json!("name")).is_err());
    }

    #[test]
    fn keeps_key_order() {
        let c = Criteria::parse(&json!({"b": 1, "a": 2, "c >": 3})).unwrap();
        let keys: Vec<&str> = c
            .items
            .iter()
            .map(|i| match i {
                CriteriaItem::Predicate { key, .. } => key.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(keys, vec!["b", "a", "c >"]);
    }

    #[test]
    fn nested_groups() {
        let c = Criteria::parse(&json!({"or": [{"a": 1}, {"and": [{"b": 2}]}]})).unwrap();
        let CriteriaItem::Or(branches) = &c.items[0] else {
            panic!("expected or group");
        };
        assert_eq!(branches.len(), 2);
        assert!(matches!(branches[1].items[0], CriteriaItem::And(_)));
    }

    #[test]
    fn single_object_group_is_one_branch() {
        let c = Criteria::parse(&json!({"or": {"a": 1}})).unwrap();
        let CriteriaItem::Or(branches) = &c.items[0] else {
            panic!("expected or group");
        };
        assert_eq!(branches.len(), 1);
    }

    #[test]
    fn bad_group_is_rejected() {
        assert!(Criteria::parse(&json!({"or": 1})).is_err());
        assert!(Criteria::parse(&json!({"and": [1, 2]})).is_err());
    }

    #[test]
    fn to_json_round_trips_the_source() {
        let src = json!({"x": 1, "or": [{"y": 2}], "z <": [3]});
        assert_eq!(Criteria::parse(&src).unwrap().to_json(), src);
    }
}
