//! DELETE statement.

use crate::criteria::WhereClause;
use crate::entity::Entity;
use crate::error::SqlResult;
use crate::statement::options::Options;
use crate::statement::{Statement, StatementKind, compile_filter, returning};
use serde_json::Value;

/// DELETE by criteria.
///
/// `null`, `"*"` and `{}` all compile to `WHERE TRUE` and delete every row.
#[derive(Debug, Clone)]
pub struct Delete {
    source: String,
    where_clause: WhereClause,
    options: Options,
}

impl Delete {
    pub fn new(entity: &Entity, criteria: &Value, mut options: Options) -> SqlResult<Self> {
        let filter = compile_filter(entity, criteria, 0, &options)?;
        if filter.by_pk {
            options.single = true;
        }
        if filter.clause.conditions == "TRUE" {
            tracing::debug!(
                target: "pgcriteria.sql",
                source = %entity.delimited_full_name(),
                "delete without conditions matches every row"
            );
        }
        Ok(Self {
            source: entity.delimited_full_name(),
            where_clause: filter.clause,
            options,
        })
    }
}

impl Statement for Delete {
    fn format(&self) -> String {
        format!(
            "DELETE FROM {}{} WHERE {}{}",
            if self.options.only { "ONLY " } else { "" },
            self.source,
            self.where_clause.conditions,
            returning(&self.options)
        )
    }

    fn params(&self) -> &[Value] {
        &self.where_clause.params
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn kind(&self) -> StatementKind {
        StatementKind::Delete
    }
}
