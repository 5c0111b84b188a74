use crate::criteria::condition::Condition;
use crate::criteria::generator::{Generator, doc_generator, table_generator};
use crate::criteria::key::parse_key;
use crate::criteria::ops::resolve;
use crate::criteria::{Criteria, CriteriaItem};
use crate::entity::Entity;
use crate::error::SqlResult;
use serde_json::Value;

/// A compiled boolean expression and its parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClause {
    pub conditions: String,
    pub params: Vec<Value>,
}

impl WhereClause {
    /// The trivial clause matching every row.
    pub fn always() -> Self {
        Self {
            conditions: "TRUE".to_string(),
            params: Vec::new(),
        }
    }
}

/// Compile a criteria object with the default table generator, numbering
/// placeholders from `$1`.
pub fn where_clause(criteria: &Value) -> SqlResult<WhereClause> {
    compile_where(&Criteria::parse(criteria)?, 0, Generator::Table)
}

/// Compile `criteria` with placeholders starting at `$offset + 1`.
pub fn compile_where(criteria: &Criteria, offset: usize, generator: Generator) -> SqlResult<WhereClause> {
    let clause = Compiler { generator, pk: &[] }.conjunction(criteria, offset)?;
    tracing::trace!(target: "pgcriteria.sql", conditions = %clause.conditions, params = clause.params.len(), "compiled where");
    Ok(clause)
}

/// Like [`compile_where`], but aware of the entity: in document mode a
/// predicate on a primary-key column targets the real column.
pub fn compile_where_for(
    entity: &Entity,
    criteria: &Criteria,
    offset: usize,
    generator: Generator,
) -> SqlResult<WhereClause> {
    let clause = Compiler { generator, pk: &entity.pk }.conjunction(criteria, offset)?;
    tracing::trace!(
        target: "pgcriteria.sql",
        source = %entity.delimited_full_name(),
        conditions = %clause.conditions,
        params = clause.params.len(),
        "compiled where"
    );
    Ok(clause)
}

struct Compiler<'a> {
    generator: Generator,
    pk: &'a [String],
}

impl Compiler<'_> {
    /// AND-join every item of `criteria`. Empty criteria compile to `TRUE`.
    fn conjunction(&self, criteria: &Criteria, offset: usize) -> SqlResult<WhereClause> {
        if criteria.is_empty() {
            return Ok(WhereClause::always());
        }

        let mut parts = Vec::with_capacity(criteria.items.len());
        let mut params = Vec::new();
        for item in &criteria.items {
            let running = offset + params.len();
            let (sql, mut item_params) = match item {
                CriteriaItem::Predicate { key, value } => self.predicate(key, value, criteria, running)?,
                CriteriaItem::Or(branches) => self.group(branches, "OR", running)?,
                CriteriaItem::And(branches) => self.group(branches, "AND", running)?,
            };
            parts.push(sql);
            params.append(&mut item_params);
        }

        Ok(WhereClause {
            conditions: parts.join(" AND "),
            params,
        })
    }

    fn predicate(
        &self,
        key: &str,
        value: &Value,
        group: &Criteria,
        offset: usize,
    ) -> SqlResult<(String, Vec<Value>)> {
        let parsed = parse_key(key);
        let operation = resolve(&parsed.operation_text);
        let on_pk = self.pk.iter().any(|pk| *pk == parsed.raw_field);
        let condition = Condition::new(parsed, operation, value.clone(), offset + 1);

        let condition = match self.generator {
            Generator::Document if !on_pk => doc_generator(condition, group)?,
            _ => table_generator(condition)?,
        };
        Ok((condition.predicate(), condition.params))
    }

    /// `((a) OR (b AND c))`. An empty disjunction matches nothing and an
    /// empty conjunction group matches everything.
    fn group(&self, branches: &[Criteria], joiner: &str, offset: usize) -> SqlResult<(String, Vec<Value>)> {
        if branches.is_empty() {
            let constant = if joiner == "OR" { "FALSE" } else { "TRUE" };
            return Ok((constant.to_string(), Vec::new()));
        }

        let mut parts = Vec::with_capacity(branches.len());
        let mut params = Vec::new();
        for branch in branches {
            let mut compiled = self.conjunction(branch, offset + params.len())?;
            parts.push(format!("({})", compiled.conditions));
            params.append(&mut compiled.params);
        }
        Ok((format!("({})", parts.join(&format!(" {joiner} "))), params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(v: Value) -> WhereClause {
        where_clause(&v).unwrap()
    }

    #[test]
    fn empty_and_wildcard_are_true() {
        assert_eq!(compile(json!({})), WhereClause::always());
        assert_eq!(compile(json!("*")), WhereClause::always());
    }

    #[test]
    fn single_equality() {
        let w = compile(json!({"field": "value"}));
        assert_eq!(w.conditions, r#""field" = $1"#);
        assert_eq!(w.params, vec![json!("value")]);
    }

    #[test]
    fn siblings_are_anded_in_key_order() {
        let w = compile(json!({"id >": 1, "id <": 10}));
        assert_eq!(w.conditions, r#""id" > $1 AND "id" < $2"#);
        assert_eq!(w.params, vec![json!(1), json!(10)]);
    }

    #[test]
    fn param_counts_per_shape() {
        let w = compile(json!({
            "a": null,
            "b": true,
            "c": "x",
            "d": [1, 2, 3],
            "e between": [1, 2],
        }));
        assert_eq!(w.params.len(), 0 + 0 + 1 + 3 + 2);
        assert_eq!(
            w.conditions,
            r#""a" IS NULL AND "b" IS TRUE AND "c" = $1 AND "d" IN ($2, $3, $4) AND "e" BETWEEN $5 AND $6"#
        );
    }

    #[test]
    fn or_group() {
        let w = compile(json!({"or": [{"a": 1}, {"b": 2, "c": 3}]}));
        assert_eq!(w.conditions, r#"(("a" = $1) OR ("b" = $2 AND "c" = $3))"#);
        assert_eq!(w.params, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn ordinals_thread_through_nesting() {
        let w = compile(json!({
            "x": 0,
            "or": [
                {"a": 1},
                {"and": [{"b": 2}, {"or": [{"c": 3}, {"d": [4, 5]}]}]},
            ],
            "y": 6,
        }));
        assert_eq!(
            w.conditions,
            r#""x" = $1 AND (("a" = $2) OR ((("b" = $3) AND ((("c" = $4) OR ("d" IN ($5, $6))))))) AND "y" = $7"#
        );
        assert_eq!(w.params.len(), 7);
    }

    #[test]
    fn empty_groups() {
        assert_eq!(compile(json!({"or": []})).conditions, "FALSE");
        assert_eq!(compile(json!({"and": []})).conditions, "TRUE");
        assert_eq!(compile(json!({"or": [{}, {"a": 1}]})).conditions, r#"((TRUE) OR ("a" = $1))"#);
    }

    #[test]
    fn initial_offset() {
        let c = Criteria::parse(&json!({"a": 1, "b": 2})).unwrap();
        let w = compile_where(&c, 3, Generator::Table).unwrap();
        assert_eq!(w.conditions, r#""a" = $4 AND "b" = $5"#);
    }

    #[test]
    fn longest_operator_in_context() {
        let w = compile(json!({"field ~~*": "%a%"}));
        assert_eq!(w.conditions, r#""field" ILIKE $1"#);
    }

    #[test]
    fn document_mode_keeps_pk_on_column() {
        let entity = Entity::document("public", "docs");
        let c = Criteria::parse(&json!({"id": 4, "title": "Dune"})).unwrap();
        let w = compile_where_for(&entity, &c, 0, Generator::Document).unwrap();
        assert_eq!(w.conditions, r#""id" = $1 AND "body" @> $2"#);
        assert_eq!(w.params, vec![json!(4), json!({"title": "Dune"})]);
    }

    #[test]
    fn invalid_values_surface() {
        assert!(where_clause(&json!({"a between": 3})).is_err());
        assert!(where_clause(&json!({"a is": "x"})).is_err());
    }
}
