//! Value mutators.
//!
//! Each mutator reshapes a [`Condition`] for one operator family and either
//! appends exactly the parameters it renders placeholders for, or none.

use crate::criteria::condition::Condition;
use crate::error::{SqlError, SqlResult};
use serde_json::Value;

pub type Mutator = fn(Condition) -> SqlResult<Condition>;

/// `BETWEEN $n AND $n+1` from a two-element array.
pub fn build_between(mut condition: Condition) -> SqlResult<Condition> {
    let (low, high) = match &condition.value {
        Value::Array(bounds) if bounds.len() == 2 => (bounds[0].clone(), bounds[1].clone()),
        other => {
            return Err(SqlError::invalid(format!(
                "BETWEEN on {} needs a two-element array, got {other}",
                condition.key.raw_field
            )));
        }
    };
    let low = condition.bind(low);
    let high = condition.bind(high);
    condition.rhs = Some(format!("{low} AND {high}"));
    Ok(condition)
}

/// `IN ($n, ...)`, or `NOT IN` for any non-equality operator.
///
/// An empty list matches nothing (`FALSE`), or everything when negated.
pub fn build_in(mut condition: Condition) -> SqlResult<Condition> {
    let negated = condition.operation.operator != "=";
    let Value::Array(items) = std::mem::take(&mut condition.value) else {
        return Err(SqlError::invalid(format!(
            "IN on {} needs an array",
            condition.key.raw_field
        )));
    };

    if items.is_empty() {
        condition.field = if negated { "TRUE" } else { "FALSE" }.to_string();
        condition.operation.operator = "";
        condition.rhs = None;
        condition.value = Value::Array(items);
        return Ok(condition);
    }

    condition.operation.operator = if negated { "NOT IN" } else { "IN" };
    let placeholders: Vec<String> = items.iter().map(|v| condition.bind(v.clone())).collect();
    condition.rhs = Some(format!("({})", placeholders.join(", ")));
    condition.value = Value::Array(items);
    Ok(condition)
}

/// `IS` / `IS NOT` with the value inlined as a SQL literal.
///
/// Only `null` and booleans can be inlined; anything else is rejected.
pub fn build_is(mut condition: Condition) -> SqlResult<Condition> {
    let literal = match &condition.value {
        Value::Null => "NULL",
        Value::Bool(true) => "TRUE",
        Value::Bool(false) => "FALSE",
        other => {
            return Err(SqlError::invalid(format!(
                "IS on {} accepts only null or a boolean, got {other}",
                condition.key.raw_field
            )));
        }
    };
    condition.operation.operator = match condition.operation.operator {
        "=" | "IS" => "IS",
        _ => "IS NOT",
    };
    condition.rhs = Some(literal.to_string());
    Ok(condition)
}

/// Dispatch for the equality family: null/boolean → IS, array → IN, else bind.
pub fn equality(mut condition: Condition) -> SqlResult<Condition> {
    match &condition.value {
        Value::Null | Value::Bool(_) => build_is(condition),
        Value::Array(_) => build_in(condition),
        _ => {
            let value = condition.value.clone();
            let placeholder = condition.bind(value);
            condition.rhs = Some(placeholder);
            Ok(condition)
        }
    }
}

/// Bind an array value as a single Postgres array literal (`{a,"b c"}`).
/// Non-array values are bound unchanged.
pub fn literalize_array(mut condition: Condition) -> SqlResult<Condition> {
    let value = match &condition.value {
        Value::Array(items) => Value::String(array_literal(items)),
        other => other.clone(),
    };
    let placeholder = condition.bind(value);
    condition.rhs = Some(placeholder);
    Ok(condition)
}

/// Postgres array literal for a JSON array.
pub fn array_literal(items: &[Value]) -> String {
    let elements: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => literalize_element(s),
            Value::Array(inner) => array_literal(inner),
            Value::Object(_) => literalize_element(&item.to_string()),
        })
        .collect();
    format!("{{{}}}", elements.join(","))
}

/// Quote one array-literal element when it is empty, spells `null`, or holds
/// a delimiter, brace, whitespace, quote or backslash.
pub fn literalize_element(s: &str) -> String {
    let needs_quotes = s.is_empty()
        || s.eq_ignore_ascii_case("null")
        || s
            .chars()
            .any(|c| matches!(c, ',' | '{' | '}' | '"' | '\\') || c.is_whitespace());
    if !needs_quotes {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out.push('"');
    out
}
