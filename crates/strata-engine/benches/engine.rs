//! Operations engine benchmarks for Strata.
//!
//! Benchmarks for:
//! - Batch inserts with validation
//! - Filtered, paginated queries
//! - Eager loading of one-to-many relations

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use strata_common::{record, Value};
use strata_engine::schema::{self, Schema};
use strata_engine::{insert, query, DatabaseState, Filter, QueryDescriptor, WithClause};

fn blog_schema() -> Schema {
    Schema::builder()
        .table(
            "users",
            [
                ("id", schema::id()),
                ("email", schema::string().unique()),
            ],
        )
        .table(
            "posts",
            [
                ("id", schema::id()),
                ("author_id", schema::number()),
                ("title", schema::string()),
            ],
        )
        .relation("users", "posts", schema::many("posts", "id", "author_id"))
        .build()
}

fn seeded(schema: &Schema, users: usize) -> DatabaseState {
    let state = DatabaseState::empty_for(schema);
    let people = (0..users)
        .map(|i| record! { "email" => format!("user{i}@example.com") })
        .collect();
    let (state, _) = insert(&state, schema, "users", people).expect("insert users failed");
    let posts = (0..users * 3)
        .map(|i| record! { "author_id" => (i % users + 1) as i64, "title" => format!("post {i}") })
        .collect();
    let (state, _) = insert(&state, schema, "posts", posts).expect("insert posts failed");
    state
}

/// Benchmark batch inserts (unique checks are a linear scan per record).
fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/insert");
    let schema = blog_schema();

    for size in [100usize, 1000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("batch", size), &size, |b, &size| {
            b.iter(|| {
                let state = DatabaseState::empty_for(&schema);
                let values = (0..size)
                    .map(|i| record! { "email" => format!("u{i}@x.com") })
                    .collect();
                black_box(insert(&state, &schema, "users", values).expect("insert failed"))
            });
        });
    }

    group.finish();
}

/// Benchmark filtered, paginated queries.
fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/query");
    let schema = blog_schema();
    let state = seeded(&schema, 1000);

    group.bench_function("filter_page", |b| {
        let descriptor = QueryDescriptor::new("posts")
            .with_filter(Filter::new(|r| {
                r.get("author_id").and_then(Value::as_f64).unwrap_or(0.0) < 500.0
            }))
            .with_offset(100)
            .with_limit(50);
        b.iter(|| black_box(query(&state, &schema, &descriptor).expect("query failed")));
    });

    group.bench_function("with_posts", |b| {
        let descriptor = QueryDescriptor::new("users")
            .with_relation("posts", WithClause::new())
            .with_limit(20);
        b.iter(|| black_box(query(&state, &schema, &descriptor).expect("query failed")));
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_query);
criterion_main!(benches);
