//! UPDATE statement.

use crate::criteria::WhereClause;
use crate::entity::Entity;
use crate::error::{SqlError, SqlResult};
use crate::ident::quote_ident;
use crate::statement::options::Options;
use crate::statement::{Statement, StatementKind, compile_filter, returning};
use serde_json::{Map, Value};

/// UPDATE with a changes map and criteria.
///
/// Changes are bound first (`$1..$k`), criteria after. Keys that are not
/// known columns of the entity are dropped. Document tables merge the
/// changes into `body` instead.
#[derive(Debug, Clone)]
pub struct Update {
    source: String,
    set: Vec<String>,
    where_clause: WhereClause,
    params: Vec<Value>,
    options: Options,
}

impl Update {
    pub fn new(entity: &Entity, changes: &Value, criteria: &Value, mut options: Options) -> SqlResult<Self> {
        let Value::Object(changes) = changes else {
            return Err(SqlError::invalid(format!("update changes must be an object, got {changes}")));
        };

        let document = options.document || entity.is_document;
        let mut params = Vec::new();
        let set = if document {
            document_changes(changes, &mut params)
        } else {
            column_changes(entity, changes, &mut params)
        };
        if set.is_empty() {
            return Err(SqlError::usage(format!(
                "update of {} has no applicable changes",
                entity.delimited_full_name()
            )));
        }

        let filter = compile_filter(entity, criteria, params.len(), &options)?;
        if filter.by_pk {
            options.single = true;
        }
        params.extend(filter.clause.params.iter().cloned());

        tracing::trace!(
            target: "pgcriteria.sql",
            source = %entity.delimited_full_name(),
            columns = set.len(),
            conditions = %filter.clause.conditions,
            "built update"
        );

        Ok(Self {
            source: entity.delimited_full_name(),
            set,
            where_clause: filter.clause,
            params,
            options,
        })
    }
}

fn column_changes(entity: &Entity, changes: &Map<String, Value>, params: &mut Vec<Value>) -> Vec<String> {
    let mut set = Vec::with_capacity(changes.len());
    for (column, value) in changes {
        if !entity.has_column(column) {
            tracing::trace!(target: "pgcriteria.sql", column = %column, "dropping unknown column");
            continue;
        }
        params.push(value.clone());
        set.push(format!("{} = ${}", quote_ident(column), params.len()));
    }
    set
}

fn document_changes(changes: &Map<String, Value>, params: &mut Vec<Value>) -> Vec<String> {
    if changes.is_empty() {
        return Vec::new();
    }
    params.push(Value::Object(changes.clone()));
    vec![format!(r#""body" = "body" || ${}::jsonb"#, params.len())]
}

impl Statement for Update {
    fn format(&self) -> String {
        format!(
            "UPDATE {}{} SET {} WHERE {}{}",
            if self.options.only { "ONLY " } else { "" },
            self.source,
            self.set.join(", "),
            self.where_clause.conditions,
            returning(&self.options)
        )
    }

    fn params(&self) -> &[Value] {
        &self.params
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn kind(&self) -> StatementKind {
        StatementKind::Update
    }
}
