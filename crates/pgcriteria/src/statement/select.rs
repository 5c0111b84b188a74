//! SELECT statement.

use crate::criteria::WhereClause;
use crate::entity::Entity;
use crate::error::{SqlError, SqlResult};
use crate::statement::options::{OrderBy, Options};
use crate::statement::{Statement, StatementKind, compile_filter};
use serde_json::Value;

/// SELECT over a table or view.
///
/// - default projection `*`, default order by primary key
/// - `offset`/`limit`, or keyset pagination via `pageLength` + `order[].last`
/// - primary-key shortcut forces single-row mode
#[derive(Debug, Clone)]
pub struct Select {
    source: String,
    where_clause: WhereClause,
    /// Keyset tuple comparison, appended to the WHERE clause.
    keyset: Option<String>,
    order_by: Option<String>,
    params: Vec<Value>,
    options: Options,
}

impl Select {
    /// Build from a criteria object, `"*"`, or a bare primary-key value.
    pub fn new(entity: &Entity, criteria: &Value, mut options: Options) -> SqlResult<Self> {
        let filter = compile_filter(entity, criteria, 0, &options)?;
        if filter.by_pk {
            options.single = true;
        }
        Self::with_where(entity, filter.clause, options)
    }

    /// Build from an already compiled predicate, e.g. a full-text search
    /// condition composed by the caller.
    pub fn with_where(entity: &Entity, where_clause: WhereClause, options: Options) -> SqlResult<Self> {
        let document = options.document || entity.is_document;
        let mut params = where_clause.params.clone();

        let keyset = match options.page_length {
            Some(_) => {
                if options.offset.is_some() || options.limit.is_some() {
                    return Err(SqlError::usage(
                        "keyset pagination cannot be combined with offset or limit",
                    ));
                }
                let order = match options.order.as_deref() {
                    Some(order) if !order.is_empty() => order,
                    _ => return Err(SqlError::usage("keyset pagination requires an order")),
                };
                keyset_predicate(order, entity, document, &mut params)?
            }
            None => None,
        };

        let order_by = match options.order.as_deref() {
            Some(order) if !order.is_empty() => Some(
                order
                    .iter()
                    .map(|o| o.render(entity, document))
                    .collect::<SqlResult<Vec<_>>>()?
                    .join(", "),
            ),
            _ if !entity.pk.is_empty() => Some(entity.delimited_pk()),
            _ => None,
        };

        tracing::trace!(
            target: "pgcriteria.sql",
            source = %entity.delimited_full_name(),
            conditions = %where_clause.conditions,
            keyset = keyset.is_some(),
            "built select"
        );

        Ok(Self {
            source: entity.delimited_full_name(),
            where_clause,
            keyset,
            order_by,
            params,
            options,
        })
    }

    /// `SELECT count(*)` over this select's filter, ignoring projection,
    /// order and paging. Returns the SQL with its parameters.
    pub fn count_sql(&self) -> (String, &[Value]) {
        let only = if self.options.only { "ONLY " } else { "" };
        (
            format!(
                "SELECT count(*) FROM {only}{} WHERE {}",
                self.source, self.where_clause.conditions
            ),
            &self.params[..self.where_clause.params.len()],
        )
    }
}

/// `("a", "b") > ($n, $n+1)` once every order entry carries a `last` value.
/// The first page (no `last` anywhere) has no predicate.
fn keyset_predicate(
    order: &[OrderBy],
    entity: &Entity,
    document: bool,
    params: &mut Vec<Value>,
) -> SqlResult<Option<String>> {
    let seen = order.iter().filter(|o| o.last.is_some()).count();
    if seen == 0 {
        return Ok(None);
    }
    if seen != order.len() {
        return Err(SqlError::usage(
            "keyset pagination needs a last value for every order entry",
        ));
    }

    let mut exprs = Vec::with_capacity(order.len());
    let mut placeholders = Vec::with_capacity(order.len());
    for entry in order {
        exprs.push(entry.expression(entity, document)?);
        params.push(entry.last.clone().unwrap_or(Value::Null));
        placeholders.push(format!("${}", params.len()));
    }
    let comparison = if order[0].is_desc() { "<" } else { ">" };
    Ok(Some(format!(
        "({}) {comparison} ({})",
        exprs.join(", "),
        placeholders.join(", ")
    )))
}

impl Statement for Select {
    fn format(&self) -> String {
        let mut sql = format!("SELECT {} FROM ", self.options.projection());
        if self.options.only {
            sql.push_str("ONLY ");
        }
        sql.push_str(&self.source);
        match &self.keyset {
            Some(keyset) => {
                sql.push_str(&format!(" WHERE ({}) AND {keyset}", self.where_clause.conditions));
            }
            None => {
                sql.push_str(" WHERE ");
                sql.push_str(&self.where_clause.conditions);
            }
        }
        if let Some(order_by) = &self.order_by {
            sql.push_str(" ORDER BY ");
            sql.push_str(order_by);
        }
        match self.options.page_length {
            Some(n) => sql.push_str(&format!(" FETCH FIRST {n} ROWS ONLY")),
            None => {
                if let Some(offset) = self.options.offset {
                    sql.push_str(&format!(" OFFSET {offset}"));
                }
                if let Some(limit) = self.options.limit {
                    sql.push_str(&format!(" LIMIT {limit}"));
                }
            }
        }
        sql
    }

    fn params(&self) -> &[Value] {
        &self.params
    }

    fn options(&self) -> &Options {
        &self.options
    }

    fn kind(&self) -> StatementKind {
        StatementKind::Select
    }
}
