//! Query evaluation.
//!
//! A query runs four steps, always in this order:
//!
//! ```text
//!   table records
//!        │  1. filter      predicate, soft-deleted rows dropped
//!        ▼
//!   owned copies
//!        │  2. eager-load  attach relations (recursively)
//!        ▼
//!        │  3. paginate    offset, then limit
//!        ▼
//!        │  4. project     top-level select
//!        ▼
//!   result rows
//! ```
//!
//! Eager loading works on copies, so the snapshot is never modified.

use std::collections::BTreeMap;

use tracing::trace;

use strata_common::error::{StrataError, StrataResult};
use strata_common::types::{Record, RecordExt, Value};
use strata_common::DEFAULT_QUERY_OFFSET;

use crate::filter::Filter;
use crate::resolve::resolve;
use crate::schema::Schema;
use crate::state::DatabaseState;

/// Source of a projected output key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRef {
    /// A declared column of the queried table.
    Column(String),
    /// A relation attached by eager loading.
    Relation(String),
}

impl FieldRef {
    /// Refers to a column.
    pub fn column(name: impl Into<String>) -> Self {
        FieldRef::Column(name.into())
    }

    /// Refers to a relation.
    pub fn relation(name: impl Into<String>) -> Self {
        FieldRef::Relation(name.into())
    }
}

/// Options for one eager-loaded relation.
#[derive(Debug, Clone, Default)]
pub struct WithClause {
    /// Keeps only matching related records.
    pub filter: Option<Filter>,
    /// Output key to target column. Relations are not selectable here.
    pub select: Option<Vec<(String, String)>>,
    /// Relations of the target table to load into each related record.
    pub with: Vec<(String, WithClause)>,
}

impl WithClause {
    /// Loads the relation with no options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Filters the related records.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Projects related records to `(output key, column)` pairs.
    #[must_use]
    pub fn select<I, K, C>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, C)>,
        K: Into<String>,
        C: Into<String>,
    {
        self.select = Some(
            fields
                .into_iter()
                .map(|(k, c)| (k.into(), c.into()))
                .collect(),
        );
        self
    }

    /// Loads a relation of the target table into each related record.
    #[must_use]
    pub fn with(mut self, relation: impl Into<String>, clause: WithClause) -> Self {
        self.with.push((relation.into(), clause));
        self
    }
}

/// Everything a query needs besides the state and schema.
#[derive(Debug, Clone, Default)]
pub struct QueryDescriptor {
    /// Table to read.
    pub table: String,
    /// Row predicate; `None` keeps every row.
    pub filter: Option<Filter>,
    /// Relations to eager-load, in request order.
    pub with: Vec<(String, WithClause)>,
    /// Output key to source.
    pub select: Option<Vec<(String, FieldRef)>>,
    /// Maximum number of rows.
    pub limit: Option<usize>,
    /// Rows to skip.
    pub offset: Option<usize>,
    /// Include soft-deleted rows.
    pub with_deleted: bool,
}

impl QueryDescriptor {
    /// Queries every row of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    /// Sets the row predicate.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Requests a relation.
    #[must_use]
    pub fn with_relation(mut self, relation: impl Into<String>, clause: WithClause) -> Self {
        self.with.push((relation.into(), clause));
        self
    }

    /// Sets the projection.
    #[must_use]
    pub fn with_select(mut self, select: Vec<(String, FieldRef)>) -> Self {
        self.select = Some(select);
        self
    }

    /// Sets the row limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the row offset.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Includes soft-deleted rows.
    #[must_use]
    pub fn include_deleted(mut self) -> Self {
        self.with_deleted = true;
        self
    }
}

/// Runs a query.
///
/// A table missing from the state yields no rows. A `select` on a table
/// missing from the schema fails with `SchemaNotFound`.
pub fn query(
    state: &DatabaseState,
    schema: &Schema,
    descriptor: &QueryDescriptor,
) -> StrataResult<Vec<Record>> {
    let filtered = filter_rows(
        state,
        schema,
        &descriptor.table,
        descriptor.filter.as_ref(),
        descriptor.with_deleted,
    );
    let mut rows: Vec<Record> = filtered.into_iter().cloned().collect();

    if !descriptor.with.is_empty() {
        eager_load(
            state,
            schema,
            &descriptor.table,
            &mut rows,
            &descriptor.with,
            descriptor.with_deleted,
        )?;
    }

    let rows = paginate(rows, descriptor.offset, descriptor.limit);

    match &descriptor.select {
        Some(select) => project(schema, &descriptor.table, rows, select),
        None => Ok(rows),
    }
}

/// Runs a query limited to one row and returns it.
pub fn first(
    state: &DatabaseState,
    schema: &Schema,
    descriptor: &QueryDescriptor,
) -> StrataResult<Option<Record>> {
    let limited = QueryDescriptor {
        limit: Some(1),
        ..descriptor.clone()
    };
    Ok(query(state, schema, &limited)?.into_iter().next())
}

/// Step 1: rows of `table` accepted by `filter`.
///
/// Rows whose soft-delete column is non-null are dropped unless
/// `with_deleted` is set.
pub(crate) fn filter_rows<'s>(
    state: &'s DatabaseState,
    schema: &Schema,
    table: &str,
    filter: Option<&Filter>,
    with_deleted: bool,
) -> Vec<&'s Record> {
    let Some(table_state) = state.table(table) else {
        return Vec::new();
    };
    let deleted_at = deleted_column(schema, table, with_deleted);

    table_state
        .records
        .iter()
        .filter(|record| is_live(record, deleted_at))
        .filter(|record| filter.map_or(true, |f| f.test(record)))
        .collect()
}

fn deleted_column<'a>(schema: &'a Schema, table: &str, with_deleted: bool) -> Option<&'a str> {
    if with_deleted {
        return None;
    }
    schema.table(table).and_then(|t| t.deleted_at_column())
}

fn is_live(record: &Record, deleted_at: Option<&str>) -> bool {
    deleted_at.map_or(true, |column| record.is_null_or_unset(column))
}

/// Step 2: attaches requested relations to each row.
fn eager_load(
    state: &DatabaseState,
    schema: &Schema,
    table: &str,
    rows: &mut [Record],
    with: &[(String, WithClause)],
    with_deleted: bool,
) -> StrataResult<()> {
    for row in rows.iter_mut() {
        for (name, clause) in with {
            let Some(relation) = schema.relation(table, name) else {
                trace!("Ignoring undeclared relation {}.{}", table, name);
                continue;
            };
            let target = relation.target_table();
            let deleted_at = deleted_column(schema, target, with_deleted);

            let mut related: Vec<Record> = resolve(state, row, relation)
                .into_iter()
                .filter(|r| is_live(r, deleted_at))
                .filter(|r| clause.filter.as_ref().map_or(true, |f| f.test(r)))
                .cloned()
                .collect();

            if !clause.with.is_empty() {
                eager_load(state, schema, target, &mut related, &clause.with, with_deleted)?;
            }

            if let Some(select) = &clause.select {
                let target_schema = schema
                    .table(target)
                    .ok_or_else(|| StrataError::schema_not_found(target))?;
                related = related
                    .into_iter()
                    .map(|r| {
                        select
                            .iter()
                            .filter(|(_, column)| target_schema.has_column(column))
                            .filter_map(|(key, column)| {
                                r.get(column).map(|v| (key.clone(), v.clone()))
                            })
                            .collect()
                    })
                    .collect();
            }

            trace!(
                "Loaded {} related record(s) for {}.{}",
                related.len(),
                table,
                name
            );

            let value = if relation.is_one() {
                related.into_iter().next().map_or(Value::Null, Value::Object)
            } else {
                Value::Array(related.into_iter().map(Value::Object).collect())
            };
            row.insert(name.clone(), value);
        }
    }
    Ok(())
}

/// Step 3: contiguous slice `[offset, offset + limit)`, clamped.
fn paginate(mut rows: Vec<Record>, offset: Option<usize>, limit: Option<usize>) -> Vec<Record> {
    let len = rows.len();
    let start = offset.unwrap_or(DEFAULT_QUERY_OFFSET).min(len);
    let end = limit.map_or(len, |l| start.saturating_add(l).min(len));
    rows.truncate(end);
    rows.drain(..start);
    rows
}

/// Step 4: keeps only the selected keys, renamed.
fn project(
    schema: &Schema,
    table: &str,
    rows: Vec<Record>,
    select: &[(String, FieldRef)],
) -> StrataResult<Vec<Record>> {
    let table_schema = schema
        .table(table)
        .ok_or_else(|| StrataError::schema_not_found(table))?;
    let relations = schema.relations(table);
    let empty = BTreeMap::new();
    let relations = relations.unwrap_or(&empty);

    Ok(rows
        .into_iter()
        .map(|row| {
            select
                .iter()
                .filter_map(|(key, source)| {
                    let source = match source {
                        FieldRef::Column(c) if table_schema.has_column(c) => c,
                        FieldRef::Relation(r) if relations.contains_key(r) => r,
                        _ => return None,
                    };
                    row.get(source).map(|v| (key.clone(), v.clone()))
                })
                .collect()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{deleted_at, id, many, number, one, string};
    use crate::state::TableState;
    use strata_common::{record, Timestamp};

    fn blog_schema() -> Schema {
        Schema::builder()
            .table("users", [("id", id()), ("name", string())])
            .table(
                "posts",
                [
                    ("id", id()),
                    ("title", string()),
                    ("author_id", number()),
                    ("deleted_at", deleted_at()),
                ],
            )
            .table(
                "comments",
                [("id", id()), ("post_id", number()), ("body", string())],
            )
            .relation("users", "posts", many("posts", "id", "author_id"))
            .relation("posts", "author", one("users", "author_id", "id"))
            .relation("posts", "comments", many("comments", "id", "post_id"))
            .build()
    }

    fn blog_state() -> DatabaseState {
        DatabaseState::from_tables([
            (
                "users".to_string(),
                TableState::with_records(
                    vec![
                        record! { "id" => 1, "name" => "Alice" },
                        record! { "id" => 2, "name" => "Bob" },
                    ],
                    2,
                ),
            ),
            (
                "posts".to_string(),
                TableState::with_records(
                    vec![
                        record! { "id" => 1, "title" => "Hello", "author_id" => 1, "deleted_at" => Value::Null },
                        record! { "id" => 2, "title" => "Again", "author_id" => 1, "deleted_at" => Value::Null },
                        record! { "id" => 3, "title" => "Gone", "author_id" => 2, "deleted_at" => Timestamp::from_micros(1) },
                    ],
                    3,
                ),
            ),
            (
                "comments".to_string(),
                TableState::with_records(
                    vec![
                        record! { "id" => 1, "post_id" => 1, "body" => "first" },
                        record! { "id" => 2, "post_id" => 1, "body" => "second" },
                        record! { "id" => 3, "post_id" => 2, "body" => "third" },
                    ],
                    3,
                ),
            ),
        ])
    }

    fn numbers_state(n: i64) -> (Schema, DatabaseState) {
        let schema = Schema::builder().table("n", [("id", id())]).build();
        let records = (1..=n).map(|i| record! { "id" => i }).collect();
        let state = DatabaseState::from_tables([(
            "n".to_string(),
            TableState::with_records(records, u64::try_from(n).unwrap()),
        )]);
        (schema, state)
    }

    fn ids(rows: &[Record]) -> Vec<f64> {
        rows.iter()
            .map(|r| r.get("id").and_then(Value::as_f64).unwrap())
            .collect()
    }

    #[test]
    fn test_query_all_and_filter() {
        let (schema, state) = (blog_schema(), blog_state());
        let all = query(&state, &schema, &QueryDescriptor::new("users")).unwrap();
        assert_eq!(all.len(), 2);

        let bob = query(
            &state,
            &schema,
            &QueryDescriptor::new("users").with_filter(Filter::matching(record! { "name" => "Bob" })),
        )
        .unwrap();
        assert_eq!(ids(&bob), vec![2.0]);
    }

    #[test]
    fn test_soft_deleted_hidden_unless_requested() {
        let (schema, state) = (blog_schema(), blog_state());
        let live = query(&state, &schema, &QueryDescriptor::new("posts")).unwrap();
        assert_eq!(ids(&live), vec![1.0, 2.0]);

        let everything = query(
            &state,
            &schema,
            &QueryDescriptor::new("posts").include_deleted(),
        )
        .unwrap();
        assert_eq!(ids(&everything), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_pagination_bounds() {
        let (schema, state) = numbers_state(100);
        let page = query(
            &state,
            &schema,
            &QueryDescriptor::new("n").with_offset(95).with_limit(10),
        )
        .unwrap();
        assert_eq!(ids(&page), vec![96.0, 97.0, 98.0, 99.0, 100.0]);

        let past_end = query(&state, &schema, &QueryDescriptor::new("n").with_offset(100)).unwrap();
        assert!(past_end.is_empty());

        let zero = query(&state, &schema, &QueryDescriptor::new("n").with_limit(0)).unwrap();
        assert!(zero.is_empty());
    }

    #[test]
    fn test_eager_load_many_and_one() {
        let (schema, state) = (blog_schema(), blog_state());
        let users = query(
            &state,
            &schema,
            &QueryDescriptor::new("users").with_relation("posts", WithClause::new()),
        )
        .unwrap();
        let alice_posts = users[0].get("posts").and_then(Value::as_array).unwrap();
        assert_eq!(alice_posts.len(), 2);
        // Bob's only post is soft-deleted.
        assert_eq!(users[1].get("posts"), Some(&Value::Array(vec![])));

        let posts = query(
            &state,
            &schema,
            &QueryDescriptor::new("posts").with_relation("author", WithClause::new()),
        )
        .unwrap();
        let author = posts[0].get("author").and_then(Value::as_object).unwrap();
        assert_eq!(author.get("name"), Some(&Value::string("Alice")));
    }

    #[test]
    fn test_eager_load_one_without_match_is_null() {
        let (schema, mut state) = (blog_schema(), blog_state());
        state = state.with_table(
            "posts",
            TableState::with_records(vec![record! { "id" => 9, "author_id" => 42 }], 9),
        );
        let posts = query(
            &state,
            &schema,
            &QueryDescriptor::new("posts").with_relation("author", WithClause::new()),
        )
        .unwrap();
        assert_eq!(posts[0].get("author"), Some(&Value::Null));
    }

    #[test]
    fn test_nested_with_filter_and_select() {
        let (schema, state) = (blog_schema(), blog_state());
        let clause = WithClause::new()
            .filter(Filter::new(|p| p.get("id") == Some(&Value::number(1))))
            .with(
                "comments",
                WithClause::new().select([("text", "body"), ("nope", "missing")]),
            );
        let users = query(
            &state,
            &schema,
            &QueryDescriptor::new("users")
                .with_filter(Filter::matching(record! { "id" => 1 }))
                .with_relation("posts", clause),
        )
        .unwrap();

        let posts = users[0].get("posts").and_then(Value::as_array).unwrap();
        assert_eq!(posts.len(), 1);
        let comments = posts[0]
            .as_object()
            .and_then(|p| p.get("comments"))
            .and_then(Value::as_array)
            .unwrap();
        assert_eq!(
            comments,
            &[
                Value::Object(record! { "text" => "first" }),
                Value::Object(record! { "text" => "second" }),
            ]
        );
    }

    #[test]
    fn test_undeclared_relation_ignored() {
        let (schema, state) = (blog_schema(), blog_state());
        let users = query(
            &state,
            &schema,
            &QueryDescriptor::new("users").with_relation("friends", WithClause::new()),
        )
        .unwrap();
        assert!(users[0].get("friends").is_none());
    }

    #[test]
    fn test_projection() {
        let (schema, state) = (blog_schema(), blog_state());
        let rows = query(
            &state,
            &schema,
            &QueryDescriptor::new("posts")
                .with_relation("author", WithClause::new())
                .with_select(vec![
                    ("headline".to_string(), FieldRef::column("title")),
                    ("by".to_string(), FieldRef::relation("author")),
                    ("ghost".to_string(), FieldRef::column("not_a_column")),
                    ("comments".to_string(), FieldRef::relation("comments")),
                ]),
        )
        .unwrap();

        let first = &rows[0];
        assert_eq!(first.len(), 2);
        assert_eq!(first.get("headline"), Some(&Value::string("Hello")));
        assert!(first.get("by").and_then(Value::as_object).is_some());
    }

    #[test]
    fn test_projection_requires_schema() {
        let schema = Schema::default();
        let (_, state) = numbers_state(3);
        let err = query(
            &state,
            &schema,
            &QueryDescriptor::new("n").with_select(vec![("id".to_string(), FieldRef::column("id"))]),
        )
        .unwrap_err();
        assert_eq!(err.code(), strata_common::ErrorCode::SchemaNotFound);
    }

    #[test]
    fn test_missing_table_is_empty() {
        let (schema, state) = (blog_schema(), DatabaseState::new());
        assert!(query(&state, &schema, &QueryDescriptor::new("users"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_first() {
        let (schema, state) = numbers_state(5);
        let row = first(&state, &schema, &QueryDescriptor::new("n").with_offset(2)).unwrap();
        assert_eq!(row.unwrap().get("id"), Some(&Value::number(3)));

        let none = first(&state, &schema, &QueryDescriptor::new("n").with_offset(5)).unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_query_does_not_modify_state() {
        let (schema, state) = (blog_schema(), blog_state());
        let snapshot = state.table("users").unwrap().clone();
        let _ = query(
            &state,
            &schema,
            &QueryDescriptor::new("users").with_relation("posts", WithClause::new()),
        )
        .unwrap();
        assert_eq!(state.table("users").unwrap(), &snapshot);
        assert!(state.table("users").unwrap().records[0].get("posts").is_none());
    }
}
