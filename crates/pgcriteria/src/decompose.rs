//! Rebuild nested objects from flat, joined rows.
//!
//! A [`DecomposeSchema`] names, for each level of the result tree, the
//! primary-key column(s) that identify an instance, the columns copied into
//! it (optionally renamed), whether the level is a list, and its children.
//!
//! ```rust
//! use pgcriteria::decompose::{DecomposeSchema, decompose};
//! use serde_json::json;
//!
//! let schema: DecomposeSchema = serde_json::from_value(json!({
//!     "pk": "parent_id",
//!     "columns": {"parent_id": "id", "parent_val": "val"},
//!     "children": {
//!         "pk": "children_id",
//!         "columns": {"children_id": "id", "children_val": "val"},
//!         "array": true
//!     }
//! }))?;
//!
//! let rows = vec![
//!     json!({"parent_id": 1, "parent_val": "p1", "children_id": 11, "children_val": "c1"}),
//!     json!({"parent_id": 1, "parent_val": "p1", "children_id": 12, "children_val": "c2"}),
//! ];
//! let rows: Vec<_> = rows.into_iter().filter_map(|r| r.as_object().cloned()).collect();
//!
//! assert_eq!(
//!     decompose(&schema, &rows)?,
//!     vec![json!({"id": 1, "val": "p1", "children": [{"id": 11, "val": "c1"}, {"id": 12, "val": "c2"}]})]
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::error::{SqlError, SqlResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;

/// One node of a decomposition schema.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct DecomposeSchema {
    /// Primary-key column(s) in the flat row.
    pub pk: Vec<String>,
    /// `(row column, output field)` pairs.
    pub columns: Vec<(String, String)>,
    /// Whether this node collects a list (children only).
    pub array: bool,
    /// Secondary sort of list items by an output field.
    pub sort: Option<String>,
    /// Child nodes by output field name.
    pub children: Vec<(String, DecomposeSchema)>,
}

impl DecomposeSchema {
    pub fn new(pk: &[&str]) -> Self {
        Self {
            pk: pk.iter().map(|s| s.to_string()).collect(),
            columns: Vec::new(),
            array: false,
            sort: None,
            children: Vec::new(),
        }
    }

    /// Map row columns to output fields: `&[("parent_id", "id")]`.
    pub fn with_columns(mut self, columns: &[(&str, &str)]) -> Self {
        self.columns = columns
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect();
        self
    }

    pub fn array(mut self) -> Self {
        self.array = true;
        self
    }

    pub fn sorted_by(mut self, field: impl Into<String>) -> Self {
        self.sort = Some(field.into());
        self
    }

    pub fn with_child(mut self, name: impl Into<String>, child: DecomposeSchema) -> Self {
        self.children.push((name.into(), child));
        self
    }

    /// Bucket key for this node in `row`; `None` when every pk component is
    /// null or missing (an outer-joined non-match).
    fn key(&self, row: &Map<String, Value>) -> Option<String> {
        let values: Vec<&Value> = self
            .pk
            .iter()
            .map(|pk| row.get(pk).unwrap_or(&Value::Null))
            .collect();
        if values.iter().all(|v| v.is_null()) {
            return None;
        }
        match values.as_slice() {
            [single] => Some(single.to_string()),
            many => Some(Value::Array(many.iter().map(|v| (*v).clone()).collect()).to_string()),
        }
    }
}

#[derive(Deserialize)]
struct RawSchema {
    pk: Value,
    #[serde(default)]
    columns: Value,
    #[serde(default)]
    array: bool,
    #[serde(default)]
    sort: Option<String>,
    #[serde(flatten)]
    children: Map<String, Value>,
}

impl TryFrom<RawSchema> for DecomposeSchema {
    type Error = SqlError;

    fn try_from(raw: RawSchema) -> SqlResult<Self> {
        let pk = match raw.pk {
            Value::String(s) => vec![s],
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok(s),
                    other => Err(SqlError::decompose(format!("pk columns must be strings, got {other}"))),
                })
                .collect::<SqlResult<_>>()?,
            other => return Err(SqlError::decompose(format!("pk must be a string or list, got {other}"))),
        };
        if pk.is_empty() {
            return Err(SqlError::decompose("pk cannot be empty"));
        }

        let columns = match raw.columns {
            Value::Null => Vec::new(),
            Value::Array(items) => items
                .into_iter()
                .map(|v| match v {
                    Value::String(s) => Ok((s.clone(), s)),
                    other => Err(SqlError::decompose(format!("column names must be strings, got {other}"))),
                })
                .collect::<SqlResult<_>>()?,
            Value::Object(map) => map
                .into_iter()
                .map(|(from, to)| match to {
                    Value::String(to) => Ok((from, to)),
                    other => Err(SqlError::decompose(format!("column '{from}' must map to a string, got {other}"))),
                })
                .collect::<SqlResult<_>>()?,
            other => return Err(SqlError::decompose(format!("columns must be a list or map, got {other}"))),
        };

        let children = raw
            .children
            .into_iter()
            .map(|(name, value)| {
                let child: DecomposeSchema = serde_json::from_value(value)
                    .map_err(|e| SqlError::decompose(format!("child '{name}': {e}")))?;
                Ok((name, child))
            })
            .collect::<SqlResult<_>>()?;

        Ok(Self {
            pk,
            columns,
            array: raw.array,
            sort: raw.sort,
            children,
        })
    }
}

#[derive(Debug, Default)]
struct Bucket {
    fields: Map<String, Value>,
    /// One collection per schema child, in schema order.
    children: Vec<Buckets>,
}

/// Instances of one node under one parent, keyed by pk, in first-seen order.
#[derive(Debug, Default)]
struct Buckets {
    index: HashMap<String, usize>,
    items: Vec<Bucket>,
}

impl Buckets {
    fn get_or_create(&mut self, key: String, schema: &DecomposeSchema) -> &mut Bucket {
        let next = self.items.len();
        let idx = *self.index.entry(key).or_insert(next);
        if idx == next {
            self.items.push(Bucket {
                fields: Map::new(),
                children: schema.children.iter().map(|_| Buckets::default()).collect(),
            });
        }
        &mut self.items[idx]
    }
}

/// Rebuild nested objects from `rows`.
///
/// Root objects come out in the order their keys were first seen. A row
/// whose root pk is null is an error; a null child pk only means that child
/// is absent for the row.
pub fn decompose(schema: &DecomposeSchema, rows: &[Map<String, Value>]) -> SqlResult<Vec<Value>> {
    let mut root = Buckets::default();
    for (n, row) in rows.iter().enumerate() {
        let key = schema.key(row).ok_or_else(|| {
            SqlError::decompose(format!(
                "row {n} has a null root primary key ({})",
                schema.pk.join(", ")
            ))
        })?;
        fill(root.get_or_create(key, schema), schema, row);
    }

    let items = flatten(root, schema);
    tracing::trace!(target: "pgcriteria.sql", rows = rows.len(), roots = items.len(), "decomposed rows");
    Ok(items)
}

fn fill(bucket: &mut Bucket, schema: &DecomposeSchema, row: &Map<String, Value>) {
    for (from, to) in &schema.columns {
        if let Some(value) = row.get(from) {
            bucket.fields.insert(to.clone(), value.clone());
        }
    }
    for ((_, child), buckets) in schema.children.iter().zip(bucket.children.iter_mut()) {
        if let Some(key) = child.key(row) {
            fill(buckets.get_or_create(key, child), child, row);
        }
    }
}

fn flatten(buckets: Buckets, schema: &DecomposeSchema) -> Vec<Value> {
    let mut items: Vec<Value> = buckets
        .items
        .into_iter()
        .map(|bucket| {
            let mut object = bucket.fields;
            for ((name, child), nested) in schema.children.iter().zip(bucket.children) {
                let mut values = flatten(nested, child);
                if child.array {
                    object.insert(name.clone(), Value::Array(values));
                } else if !values.is_empty() {
                    object.insert(name.clone(), values.swap_remove(0));
                }
            }
            Value::Object(object)
        })
        .collect();

    if let Some(field) = &schema.sort {
        items.sort_by(|a, b| compare(a.get(field), b.get(field)));
    }
    items
}

/// Ordering for sort fields: missing/null first, then booleans, numbers,
/// strings; anything else keeps its relative order.
fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(_) => 4,
        }
    }
    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
