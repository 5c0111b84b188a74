//! Statement builders.
//!
//! Each builder takes an [`Entity`], criteria and/or record data, and
//! [`Options`], validates them up front, and then renders SQL text whose
//! placeholders `$1..$n` line up with [`Statement::params`].
//!
//! ```rust
//! use pgcriteria::statement::{Insert, Options, Select, Statement};
//! use pgcriteria::Entity;
//! use serde_json::json;
//!
//! let users = Entity::table("public", "users").with_pk(&["id"]);
//!
//! let select = Select::new(&users, &json!({}), Options::new())?;
//! assert_eq!(select.format(), r#"SELECT * FROM "public"."users" WHERE TRUE ORDER BY "id""#);
//!
//! let insert = Insert::new(&users, &json!([{"f": 1}, {"f": 2}]), Options::new())?;
//! assert_eq!(
//!     insert.format(),
//!     r#"INSERT INTO "public"."users" ("f") VALUES ($1), ($2) RETURNING *"#
//! );
//! assert_eq!(insert.params(), &[json!(1), json!(2)]);
//! # Ok::<(), pgcriteria::SqlError>(())
//! ```

mod delete;
mod insert;
mod options;
mod select;
mod update;


pub use delete::Delete;
pub use insert::Insert;
pub use options::{Direction, Nulls, OrderBy, Options};
pub use select::Select;
pub use update::Update;

use crate::criteria::{Criteria, Generator, WhereClause, compile_where_for};
use crate::entity::Entity;
use crate::error::{SqlError, SqlResult};
use serde_json::Value;

/// What kind of statement a builder produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
}

impl StatementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatementKind::Select => "SELECT",
            StatementKind::Insert => "INSERT",
            StatementKind::Update => "UPDATE",
            StatementKind::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finished statement.
///
/// `format()` is a pure projection of the builder's inputs: calling it
/// repeatedly yields the same text.
pub trait Statement: Sync {
    /// Render the SQL text.
    fn format(&self) -> String;

    /// Parameters for `$1..$n`, in order.
    fn params(&self) -> &[Value];

    /// Effective options (the builder may force `single`).
    fn options(&self) -> &Options;

    fn kind(&self) -> StatementKind;
}

/// Pick the condition generator: an explicit `generator` option wins, then
/// document mode on the options or the entity.
pub(crate) fn generator_for(entity: &Entity, options: &Options) -> SqlResult<Generator> {
    match &options.generator {
        Some(name) => Generator::from_name(name),
        None if options.document || entity.is_document => Ok(Generator::Document),
        None => Ok(Generator::Table),
    }
}

/// Compiled criteria plus whether it was a primary-key lookup.
pub(crate) struct Filter {
    pub clause: WhereClause,
    pub by_pk: bool,
}

/// Compile statement criteria starting after `offset` parameters.
///
/// A bare number or UUID string, or an object whose only key is the
/// single primary-key column with a scalar value, becomes a direct
/// `"pk" = $n` lookup that bypasses the generators.
pub(crate) fn compile_filter(
    entity: &Entity,
    criteria: &Value,
    offset: usize,
    options: &Options,
) -> SqlResult<Filter> {
    if let Some(pk_value) = pk_lookup(entity, criteria)? {
        let column = entity
            .pk
            .first()
            .ok_or_else(|| SqlError::usage(format!("{} has no primary key", entity.delimited_full_name())))?;
        let clause = WhereClause {
            conditions: format!("{} = ${}", crate::ident::quote_ident(column), offset + 1),
            params: vec![pk_value],
        };
        return Ok(Filter { clause, by_pk: true });
    }

    let generator = generator_for(entity, options)?;
    let criteria = Criteria::parse(criteria)?;
    Ok(Filter {
        clause: compile_where_for(entity, &criteria, offset, generator)?,
        by_pk: false,
    })
}

fn pk_lookup(entity: &Entity, criteria: &Value) -> SqlResult<Option<Value>> {
    let bare = match criteria {
        Value::Number(_) => true,
        Value::String(s) if s == "*" => false,
        Value::String(s) if uuid::Uuid::parse_str(s).is_ok() => true,
        Value::String(s) => {
            return Err(SqlError::invalid(format!(
                "'{s}' is neither a criteria object nor a primary key"
            )));
        }
        _ => false,
    };
    if bare {
        if entity.pk.len() != 1 {
            return Err(SqlError::usage(format!(
                "primary key lookup on {} needs a single-column primary key",
                entity.delimited_full_name()
            )));
        }
        return Ok(Some(criteria.clone()));
    }

    if let (Value::Object(map), [pk]) = (criteria, entity.pk.as_slice()) {
        if map.len() == 1 {
            if let Some(value @ (Value::Number(_) | Value::String(_))) = map.get(pk) {
                return Ok(Some(value.clone()));
            }
        }
    }
    Ok(None)
}

/// `RETURNING <projection>`, shared by the write statements.
pub(crate) fn returning(options: &Options) -> String {
    format!(" RETURNING {}", options.projection())
}
