//! Condition generators: turn one resolved [`Condition`] into a predicate.

use crate::criteria::Criteria;
use crate::criteria::condition::Condition;
use crate::criteria::key::PathToken;
use crate::error::{SqlError, SqlResult};
use chrono::DateTime;
use serde_json::{Map, Value};

/// Which generator compiles a criteria object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Generator {
    /// Ordinary columns.
    #[default]
    Table,
    /// Fields inside the JSONB `body` column of a document table.
    Document,
}

impl Generator {
    /// Resolve a generator by its option name.
    pub fn from_name(name: &str) -> SqlResult<Self> {
        match name {
            "tableGenerator" | "table" => Ok(Self::Table),
            "docGenerator" | "document" => Ok(Self::Document),
            other => Err(SqlError::usage(format!("unknown generator '{other}'"))),
        }
    }
}

/// Apply the operation's mutator, or bind a present value as the next
/// placeholder. A `null` with a non-equality operator is inlined as `NULL`.
pub fn table_generator(mut condition: Condition) -> SqlResult<Condition> {
    if let Some(mutator) = condition.operation.mutator {
        return mutator(condition);
    }
    if condition.value.is_null() {
        condition.rhs = Some("NULL".to_string());
        return Ok(condition);
    }
    let value = condition.value.clone();
    let placeholder = condition.bind(value);
    condition.rhs = Some(placeholder);
    Ok(condition)
}

/// Generator for document tables.
///
/// - An array of objects matches the whole `group` by containment:
///   `"body" @> $n`.
/// - Scalar equality on a key path matches `{field: value}` by containment.
/// - Anything else extracts the field as text from the body, casts it from
///   the value's type, and continues like [`table_generator`].
pub fn doc_generator(mut condition: Condition, group: &Criteria) -> SqlResult<Condition> {
    let is_object_list = matches!(
        &condition.value,
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_object)
    );
    if is_object_list {
        return Ok(containment(condition, group.to_json()));
    }

    let keys_only = condition.key.path.iter().all(|t| matches!(t, PathToken::Key(_)));
    if condition.operation.operator == "="
        && !condition.value.is_array()
        && condition.key.cast.is_none()
        && keys_only
    {
        let mut doc = condition.value.clone();
        for step in condition.key.path.iter().rev() {
            let mut obj = Map::new();
            obj.insert(step.text().to_string(), doc);
            doc = Value::Object(obj);
        }
        let mut obj = Map::new();
        obj.insert(condition.key.raw_field.clone(), doc);
        return Ok(containment(condition, Value::Object(obj)));
    }

    condition.field = match (&condition.key.cast, infer_cast(&condition.value)) {
        (Some(_), _) => condition.key.body_field(),
        (None, Some(cast)) => format!("({})::{cast}", condition.key.body_path()),
        (None, None) => format!("({})", condition.key.body_path()),
    };
    table_generator(condition)
}

fn containment(mut condition: Condition, doc: Value) -> Condition {
    condition.field = "\"body\"".to_string();
    condition.operation.operator = "@>";
    condition.operation.mutator = None;
    let placeholder = condition.bind(doc);
    condition.rhs = Some(placeholder);
    condition
}

/// Cast implied by a comparison value: booleans, numbers, and RFC 3339
/// timestamps. Arrays take the type of their first element.
fn infer_cast(value: &Value) -> Option<&'static str> {
    match value {
        Value::Bool(_) => Some("boolean"),
        Value::Number(_) => Some("decimal"),
        Value::String(s) if DateTime::parse_from_rfc3339(s).is_ok() => Some("timestamptz"),
        Value::Array(items) => items.first().and_then(infer_cast),
        _ => None,
    }
}
