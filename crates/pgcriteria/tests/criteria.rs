use pgcriteria::criteria::{Criteria, CriteriaItem, compile_where};
use pgcriteria::{Generator, SqlError, where_clause};
use serde_json::json;

#[test]
fn operators_in_keys() {
    let w = where_clause(&json!({
        "name not ilike": "a%",
        "status !": ["banned", "deleted"],
        "flag": true,
        "deleted_at is not": null,
        "score between": [1, 5],
        "email ~*": "@example\\.com$",
    }))
    .unwrap();

    assert_eq!(
        w.conditions,
        concat!(
            r#""name" NOT ILIKE $1 AND "status" NOT IN ($2, $3) AND "flag" IS TRUE AND "#,
            r#""deleted_at" IS NOT NULL AND "score" BETWEEN $4 AND $5 AND "email" ~* $6"#
        )
    );
    assert_eq!(
        w.params,
        vec![
            json!("a%"),
            json!("banned"),
            json!("deleted"),
            json!(1),
            json!(5),
            json!("@example\\.com$"),
        ]
    );
}

#[test]
fn empty_in_lists_have_no_params() {
    let w = where_clause(&json!({"id": [], "tag <>": []})).unwrap();
    assert_eq!(w.conditions, "FALSE AND TRUE");
    assert!(w.params.is_empty());
}

#[test]
fn array_operators_bind_literals() {
    let w = where_clause(&json!({"tags @>": ["a", "b c"], "ids &&": [1, 2]})).unwrap();
    assert_eq!(w.conditions, r#""tags" @> $1 AND "ids" && $2"#);
    assert_eq!(w.params, vec![json!(r#"{a,"b c"}"#), json!("{1,2}")]);
}

#[test]
fn json_keys_in_table_mode() {
    let w = where_clause(&json!({"data.name": "x", "data.tags[0]": "y"})).unwrap();
    assert_eq!(
        w.conditions,
        r##""data"->>'name' = $1 AND "data"#>>'{tags,0}' = $2"##
    );
}

#[test]
fn groups_number_params_in_order() {
    let w = where_clause(&json!({
        "a": 1,
        "or": [{"b": 2}, {"c": 3, "d": 4}],
        "e": 5,
    }))
    .unwrap();
    assert_eq!(
        w.conditions,
        r#""a" = $1 AND (("b" = $2) OR ("c" = $3 AND "d" = $4)) AND "e" = $5"#
    );
    assert_eq!(w.params, vec![json!(1), json!(2), json!(3), json!(4), json!(5)]);
}

#[test]
fn offset_shifts_placeholders() {
    let criteria = Criteria::parse(&json!({"a": 1, "b >": 2})).unwrap();
    let w = compile_where(&criteria, 3, Generator::Table).unwrap();
    assert_eq!(w.conditions, r#""a" = $4 AND "b" > $5"#);
}

#[test]
fn document_mode() {
    let criteria = Criteria::parse(&json!({"author.name": "Herbert", "pages >=": 400})).unwrap();
    let w = compile_where(&criteria, 0, Generator::Document).unwrap();
    assert_eq!(
        w.conditions,
        r#""body" @> $1 AND ("body"->>'pages')::decimal >= $2"#
    );
    assert_eq!(w.params, vec![json!({"author": {"name": "Herbert"}}), json!(400)]);
}

#[test]
fn criteria_parse_shapes() {
    let c = Criteria::parse(&json!({"a": 1, "or": [{"b": 2}]})).unwrap();
    assert_eq!(c.items.len(), 2);
    assert!(matches!(&c.items[1], CriteriaItem::Or(groups) if groups.len() == 1));

    assert!(Criteria::parse(&json!(null)).unwrap().is_empty());
    assert!(Criteria::parse(&json!("*")).unwrap().is_empty());
    assert!(matches!(Criteria::parse(&json!([1])), Err(SqlError::InvalidCriteria(_))));
}

#[test]
fn invalid_values_are_rejected() {
    assert!(matches!(
        where_clause(&json!({"a between": [1]})),
        Err(SqlError::InvalidCriteria(_))
    ));
    assert!(matches!(
        where_clause(&json!({"a is": 3})),
        Err(SqlError::InvalidCriteria(_))
    ));
    assert!(matches!(
        where_clause(&json!({"or": "x"})),
        Err(SqlError::InvalidCriteria(_))
    ));
}
