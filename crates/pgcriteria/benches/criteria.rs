use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use pgcriteria::statement::{Options, Select, Statement};
use pgcriteria::{DecomposeSchema, Entity, decompose, where_clause};
use serde_json::{Map, Value, json};

/// Criteria with `n` predicates spread over plain, JSON and IN keys, plus
/// one `or` group: {"col0": 0, "body.k1 >": 1, "col2": [2, 3], ..., "or": [...]}
fn build_criteria(n: usize) -> Value {
    let mut map = Map::new();
    for i in 0..n {
        let (key, value) = match i % 3 {
            0 => (format!("col{i}"), json!(i)),
            1 => (format!("body.k{i} >"), json!(i)),
            _ => (format!("col{i}"), json!([i, i + 1])),
        };
        map.insert(key, value);
    }
    map.insert("or".to_string(), json!([{"status": "a"}, {"status is": null}]));
    Value::Object(map)
}

fn bench_where_clause(c: &mut Criterion) {
    let mut group = c.benchmark_group("criteria/where_clause");

    for n in [1, 5, 10, 50] {
        let criteria = build_criteria(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &criteria, |b, criteria| {
            b.iter(|| black_box(where_clause(criteria)));
        });
    }

    group.finish();
}

fn bench_in_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("criteria/in_list");

    for n in [5, 20, 100, 500] {
        let criteria = json!({ "id": (0..n).collect::<Vec<i64>>() });
        group.bench_with_input(BenchmarkId::from_parameter(n), &criteria, |b, criteria| {
            b.iter(|| black_box(where_clause(criteria)));
        });
    }

    group.finish();
}

fn bench_select_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("criteria/select_format");
    let users = Entity::table("public", "users").with_pk(&["id"]);

    for n in [1, 10, 50] {
        let criteria = build_criteria(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &criteria, |b, criteria| {
            b.iter(|| {
                let select = Select::new(&users, criteria, Options::new().with_limit(10));
                black_box(select.map(|s| s.format()))
            });
        });
    }

    group.finish();
}

fn bench_decompose(c: &mut Criterion) {
    let mut group = c.benchmark_group("criteria/decompose");
    let schema = DecomposeSchema::new(&["user_id"])
        .with_columns(&[("user_id", "id"), ("user_name", "name")])
        .with_child(
            "posts",
            DecomposeSchema::new(&["post_id"])
                .with_columns(&[("post_id", "id"), ("post_title", "title")])
                .array(),
        );

    for n in [10, 100, 1000] {
        let rows: Vec<Map<String, Value>> = (0..n)
            .map(|i| {
                let row = json!({
                    "user_id": i / 10,
                    "user_name": format!("user{}", i / 10),
                    "post_id": i,
                    "post_title": format!("post{i}"),
                });
                match row {
                    Value::Object(map) => map,
                    _ => unreachable!(),
                }
            })
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(n), &rows, |b, rows| {
            b.iter(|| black_box(decompose(&schema, rows)));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_where_clause,
    bench_in_list,
    bench_select_format,
    bench_decompose
);
criterion_main!(benches);
