//! Statement options.
//!
//! Options deserialize from the camelCase JSON names callers already use
//! (`pageLength`, `onConflictIgnore`, ...) or can be built fluently.

use crate::decompose::DecomposeSchema;
use crate::entity::Entity;
use crate::error::{SqlError, SqlResult};
use crate::ident::quote_ident;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Shape and mode options shared by every statement builder.
///
/// # Example
///
/// ```rust
/// use pgcriteria::statement::{Options, OrderBy};
///
/// let from_json: Options = serde_json::from_value(serde_json::json!({
///     "fields": "name",
///     "order": [{"field": "name", "direction": "DESC"}],
///     "pageLength": 20,
/// }))?;
///
/// let built = Options::new()
///     .with_fields(&["name"])
///     .with_order(OrderBy::field("name").desc())
///     .with_page_length(20);
///
/// assert_eq!(from_json, built);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Options {
    /// Projection / RETURNING list. Empty means `*`.
    #[serde(deserialize_with = "one_or_many")]
    pub fields: Vec<String>,
    /// Raw SQL expressions keyed by output alias, in insertion order.
    #[serde(deserialize_with = "ordered_exprs")]
    pub exprs: Vec<(String, String)>,
    /// Exclude rows of descendant tables.
    pub only: bool,
    pub order: Option<Vec<OrderBy>>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    /// Enables keyset pagination.
    pub page_length: Option<u64>,
    /// Expect at most one row.
    pub single: bool,
    /// Treat the source as a document table.
    pub document: bool,
    /// Condition generator name (`tableGenerator` / `docGenerator`).
    pub generator: Option<String>,
    /// Produce SQL without executing it.
    pub build: bool,
    pub stream: bool,
    pub on_conflict_ignore: bool,
    pub deep_insert: bool,
    /// Rebuild nested objects from the flat result rows.
    pub decompose: Option<DecomposeSchema>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = fields.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Add a raw SQL expression projected as `alias`.
    pub fn with_expr(mut self, alias: impl Into<String>, sql: impl Into<String>) -> Self {
        self.exprs.push((alias.into(), sql.into()));
        self
    }

    pub fn only(mut self) -> Self {
        self.only = true;
        self
    }

    /// Append an ORDER BY entry.
    pub fn with_order(mut self, order: OrderBy) -> Self {
        self.order.get_or_insert_with(Vec::new).push(order);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_page_length(mut self, page_length: u64) -> Self {
        self.page_length = Some(page_length);
        self
    }

    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    pub fn document(mut self) -> Self {
        self.document = true;
        self
    }

    pub fn with_generator(mut self, name: impl Into<String>) -> Self {
        self.generator = Some(name.into());
        self
    }

    pub fn build_only(mut self) -> Self {
        self.build = true;
        self
    }

    pub fn stream(mut self) -> Self {
        self.stream = true;
        self
    }

    pub fn on_conflict_ignore(mut self) -> Self {
        self.on_conflict_ignore = true;
        self
    }

    pub fn deep_insert(mut self) -> Self {
        self.deep_insert = true;
        self
    }

    pub fn with_decompose(mut self, schema: DecomposeSchema) -> Self {
        self.decompose = Some(schema);
        self
    }

    /// Render the projection: fields (parsed as keys, so JSON paths and
    /// casts work) followed by aliased expressions. Defaults to `*`.
    pub(crate) fn projection(&self) -> String {
        let mut cols: Vec<String> = self
            .fields
            .iter()
            .map(|f| if f == "*" { f.clone() } else { crate::criteria::parse_key(f).field })
            .collect();
        cols.extend(
            self.exprs
                .iter()
                .map(|(alias, sql)| format!("{sql} AS {}", quote_ident(alias))),
        );
        if cols.is_empty() {
            "*".to_string()
        } else {
            cols.join(", ")
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Direction {
    Asc,
    Desc,
}

impl TryFrom<String> for Direction {
    type Error = SqlError;

    fn try_from(s: String) -> SqlResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(SqlError::usage(format!("unknown sort direction '{other}'"))),
        }
    }
}

/// Placement of nulls in an ORDER BY entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum Nulls {
    First,
    Last,
}

impl TryFrom<String> for Nulls {
    type Error = SqlError;

    fn try_from(s: String) -> SqlResult<Self> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            other => Err(SqlError::usage(format!("unknown nulls placement '{other}'"))),
        }
    }
}

/// One ORDER BY entry: a field (parsed like a criteria key) or a raw
/// expression, plus direction, cast, nulls placement and, for keyset
/// pagination, the last value seen on the previous page.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OrderBy {
    pub field: Option<String>,
    pub expr: Option<String>,
    pub direction: Option<Direction>,
    #[serde(rename = "type")]
    pub cast: Option<String>,
    pub nulls: Option<Nulls>,
    pub last: Option<Value>,
}

impl OrderBy {
    pub fn field(field: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            ..Self::default()
        }
    }

    pub fn expr(expr: impl Into<String>) -> Self {
        Self {
            expr: Some(expr.into()),
            ..Self::default()
        }
    }

    pub fn asc(mut self) -> Self {
        self.direction = Some(Direction::Asc);
        self
    }

    pub fn desc(mut self) -> Self {
        self.direction = Some(Direction::Desc);
        self
    }

    pub fn with_cast(mut self, cast: impl Into<String>) -> Self {
        self.cast = Some(cast.into());
        self
    }

    pub fn nulls(mut self, nulls: Nulls) -> Self {
        self.nulls = Some(nulls);
        self
    }

    pub fn after(mut self, last: Value) -> Self {
        self.last = Some(last);
        self
    }

    pub fn is_desc(&self) -> bool {
        self.direction == Some(Direction::Desc)
    }

    /// The sort expression. In document mode fields are read from `"body"`,
    /// except primary-key and listed columns of `entity`.
    pub(crate) fn expression(&self, entity: &Entity, document: bool) -> SqlResult<String> {
        let base = match (&self.field, &self.expr) {
            (Some(field), _) => {
                let key = crate::criteria::parse_key(field);
                let in_body = document
                    && !entity.is_pk(&key.raw_field)
                    && !entity.columns.contains(&key.raw_field);
                if in_body { key.body_path() } else { key.field }
            }
            (None, Some(expr)) => expr.clone(),
            (None, None) => {
                return Err(SqlError::usage("order entries need a field or an expr"));
            }
        };
        Ok(match &self.cast {
            Some(cast) => format!("({base})::{cast}"),
            None => base,
        })
    }

    /// The full entry: expression, direction and nulls placement.
    pub(crate) fn render(&self, entity: &Entity, document: bool) -> SqlResult<String> {
        let mut out = self.expression(entity, document)?;
        match self.direction {
            Some(Direction::Asc) => out.push_str(" ASC"),
            Some(Direction::Desc) => out.push_str(" DESC"),
            None => {}
        }
        match self.nulls {
            Some(Nulls::First) => out.push_str(" NULLS FIRST"),
            Some(Nulls::Last) => out.push_str(" NULLS LAST"),
            None => {}
        }
        Ok(out)
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(OneOrMany::One(s)) => vec![s],
        Some(OneOrMany::Many(v)) => v,
    })
}

fn ordered_exprs<'de, D>(deserializer: D) -> Result<Vec<(String, String)>, D::Error>
where
    D: Deserializer<'de>,
{
    let map = Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default();
    map.into_iter()
        .map(|(alias, sql)| match sql {
            Value::String(sql) => Ok((alias, sql)),
            other => Err(serde::de::Error::custom(format!(
                "expression '{alias}' must be a string, got {other}"
            ))),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fields_accept_one_or_many() {
        let o: Options = serde_json::from_value(json!({"fields": "a"})).unwrap();
        assert_eq!(o.fields, vec!["a"]);
        let o: Options = serde_json::from_value(json!({"fields": ["a", "b"]})).unwrap();
        assert_eq!(o.fields, vec!["a", "b"]);
    }

    #[test]
    fn exprs_keep_order() {
        let o: Options =
            serde_json::from_value(json!({"exprs": {"z": "1 + 1", "a": "now()"}})).unwrap();
        assert_eq!(o.projection(), r#"1 + 1 AS "z", now() AS "a""#);
    }

    #[test]
    fn exprs_must_be_strings() {
        assert!(serde_json::from_value::<Options>(json!({"exprs": {"a": 1}})).is_err());
    }

    #[test]
    fn projection_parses_keys() {
        let o = Options::new().with_fields(&["id", "meta.color", "*"]);
        assert_eq!(o.projection(), r#""id", "meta"->>'color', *"#);
        assert_eq!(Options::new().projection(), "*");
    }

    #[test]
    fn camel_case_names() {
        let o: Options = serde_json::from_value(json!({
            "pageLength": 5,
            "onConflictIgnore": true,
            "deepInsert": true,
            "generator": "docGenerator",
        }))
        .unwrap();
        assert_eq!(o.page_length, Some(5));
        assert!(o.on_conflict_ignore);
        assert!(o.deep_insert);
        assert_eq!(o.generator.as_deref(), Some("docGenerator"));
    }

    #[test]
    fn order_entries() {
        let o: Options = serde_json::from_value(json!({
            "order": [
                {"field": "name", "direction": "Desc", "nulls": "LAST"},
                {"expr": "length(name)", "type": "int"},
            ]
        }))
        .unwrap();
        let order = o.order.unwrap();
        let users = Entity::table("public", "users");
        assert_eq!(order[0].render(&users, false).unwrap(), r#""name" DESC NULLS LAST"#);
        assert_eq!(order[1].render(&users, false).unwrap(), "(length(name))::int");
    }

    #[test]
    fn bad_direction_is_rejected() {
        let r = serde_json::from_value::<Options>(json!({"order": [{"field": "a", "direction": "up"}]}));
        assert!(r.is_err());
    }

    #[test]
    fn document_order_reads_body() {
        let o = OrderBy::field("price").with_cast("decimal").desc();
        let docs = Entity::document("public", "docs");
        assert_eq!(o.render(&docs, true).unwrap(), r#"("body"->>'price')::decimal DESC"#);
    }

    #[test]
    fn document_order_keeps_real_columns() {
        let docs = Entity::document("public", "docs").with_columns(&["id", "created_at"]);
        assert_eq!(OrderBy::field("id").render(&docs, true).unwrap(), r#""id""#);
        assert_eq!(OrderBy::field("created_at").desc().render(&docs, true).unwrap(), r#""created_at" DESC"#);
        assert_eq!(OrderBy::field("title").render(&docs, true).unwrap(), r#""body"->>'title'"#);
    }

    #[test]
    fn order_needs_field_or_expr() {
        assert!(OrderBy::default().render(&Entity::table("public", "t"), false).is_err());
    }
}
