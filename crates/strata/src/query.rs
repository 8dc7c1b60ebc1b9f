//! Fluent query builder shared by both operating modes.

use std::collections::BTreeMap;

use strata_common::error::StrataResult;
use strata_common::types::Record;
use strata_engine::{
    aggregate, first, query, Aggregation, DatabaseState, FieldRef, Filter, QueryDescriptor,
    Schema, WithClause,
};
use strata_storage::StorageAdapter;

/// Where a query reads its snapshot from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Source<'a> {
    /// A snapshot held by the caller.
    Snapshot(&'a DatabaseState),
    /// A fresh read through the adapter on every execution.
    Storage(&'a dyn StorageAdapter),
}

impl Source<'_> {
    fn load(self, schema: &Schema) -> StrataResult<DatabaseState> {
        match self {
            Source::Snapshot(state) => Ok(state.clone()),
            Source::Storage(adapter) => adapter.read(schema),
        }
    }
}

/// Entry point of a query: pick the table.
#[derive(Debug)]
pub struct QueryBuilder<'a> {
    schema: &'a Schema,
    source: Source<'a>,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(schema: &'a Schema, source: Source<'a>) -> Self {
        Self { schema, source }
    }

    /// Queries `table`.
    pub fn from(self, table: impl Into<String>) -> TableQuery<'a> {
        TableQuery {
            schema: self.schema,
            source: self.source,
            descriptor: QueryDescriptor::new(table),
        }
    }
}

/// A query against one table.
///
/// Builder calls only record options; nothing runs until [`all`],
/// [`first`] or [`aggregate`].
///
/// [`all`]: TableQuery::all
/// [`first`]: TableQuery::first
/// [`aggregate`]: TableQuery::aggregate
#[derive(Debug, Clone)]
#[must_use]
pub struct TableQuery<'a> {
    schema: &'a Schema,
    source: Source<'a>,
    descriptor: QueryDescriptor,
}

impl<'a> TableQuery<'a> {
    /// Projects each row onto the given output keys.
    pub fn select<I, K>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, FieldRef)>,
        K: Into<String>,
    {
        let select = fields.into_iter().map(|(k, f)| (k.into(), f)).collect();
        self.descriptor = self.descriptor.with_select(select);
        self
    }

    /// Keeps rows for which `predicate` returns true.
    pub fn filter<F>(self, predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.filter_by(Filter::new(predicate))
    }

    /// Keeps rows whose columns equal every column of `partial`.
    pub fn filter_eq(self, partial: Record) -> Self {
        self.filter_by(Filter::matching(partial))
    }

    /// Keeps rows accepted by `filter`. Replaces any earlier filter.
    pub fn filter_by(mut self, filter: Filter) -> Self {
        self.descriptor.filter = Some(filter);
        self
    }

    /// Attaches a relation to each row. Requesting the same relation again
    /// replaces its options.
    pub fn with(mut self, relation: impl Into<String>, clause: WithClause) -> Self {
        let relation = relation.into();
        self.descriptor.with.retain(|(name, _)| *name != relation);
        self.descriptor = self.descriptor.with_relation(relation, clause);
        self
    }

    /// Includes soft-deleted rows, here and in loaded relations.
    pub fn with_deleted(mut self) -> Self {
        self.descriptor = self.descriptor.include_deleted();
        self
    }

    /// Returns at most `count` rows.
    pub fn limit(mut self, count: usize) -> Self {
        self.descriptor = self.descriptor.with_limit(count);
        self
    }

    /// Skips the first `count` rows.
    pub fn offset(mut self, count: usize) -> Self {
        self.descriptor = self.descriptor.with_offset(count);
        self
    }

    /// The options recorded so far.
    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    /// Runs the query.
    pub fn all(self) -> StrataResult<Vec<Record>> {
        let state = self.source.load(self.schema)?;
        query(&state, self.schema, &self.descriptor)
    }

    /// Runs the query and returns its first row.
    pub fn first(self) -> StrataResult<Option<Record>> {
        let state = self.source.load(self.schema)?;
        first(&state, self.schema, &self.descriptor)
    }

    /// Aggregates the filtered rows. `limit`, `offset`, `select` and `with`
    /// are ignored.
    pub fn aggregate<I, K>(self, aggregations: I) -> StrataResult<BTreeMap<String, Option<f64>>>
    where
        I: IntoIterator<Item = (K, Aggregation)>,
        K: Into<String>,
    {
        let aggregations: Vec<(String, Aggregation)> = aggregations
            .into_iter()
            .map(|(k, a)| (k.into(), a))
            .collect();
        let state = self.source.load(self.schema)?;
        aggregate(&state, self.schema, &self.descriptor, &aggregations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::{record, Value};
    use strata_engine::schema::{self, deleted_at};
    use strata_engine::insert;

    fn blog() -> (Schema, DatabaseState) {
        let schema = Schema::builder()
            .table(
                "users",
                [("id", schema::id()), ("name", schema::string()), ("deleted_at", deleted_at())],
            )
            .table(
                "posts",
                [("id", schema::id()), ("author_id", schema::number()), ("views", schema::number())],
            )
            .relation("users", "posts", schema::many("posts", "id", "author_id"))
            .build();
        let state = DatabaseState::empty_for(&schema);
        let (state, _) = insert(
            &state,
            &schema,
            "users",
            vec![record! { "name" => "Ann" }, record! { "name" => "Ben" }],
        )
        .unwrap();
        let (state, _) = insert(
            &state,
            &schema,
            "posts",
            vec![
                record! { "author_id" => 1, "views" => 10 },
                record! { "author_id" => 1, "views" => 5 },
                record! { "author_id" => 2, "views" => 1 },
            ],
        )
        .unwrap();
        (schema, state)
    }

    fn builder<'a>(schema: &'a Schema, state: &'a DatabaseState) -> QueryBuilder<'a> {
        QueryBuilder::new(schema, Source::Snapshot(state))
    }

    #[test]
    fn test_builder_chain() {
        let (schema, state) = blog();
        let rows = builder(&schema, &state)
            .from("posts")
            .filter(|r| r.get("views").and_then(Value::as_f64).unwrap_or(0.0) > 2.0)
            .offset(1)
            .limit(5)
            .select([("v", FieldRef::column("views"))])
            .all()
            .unwrap();
        assert_eq!(rows, vec![record! { "v" => 5 }]);
    }

    #[test]
    fn test_filter_eq_and_first() {
        let (schema, state) = blog();
        let user = builder(&schema, &state)
            .from("users")
            .filter_eq(record! { "name" => "Ben" })
            .first()
            .unwrap()
            .unwrap();
        assert_eq!(user.get("id"), Some(&Value::number(2)));

        let none = builder(&schema, &state)
            .from("users")
            .filter_eq(record! { "name" => "Zed" })
            .first()
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn test_with_replaces_same_relation() {
        let (schema, state) = blog();
        let query = builder(&schema, &state)
            .from("users")
            .with("posts", WithClause::new())
            .with(
                "posts",
                WithClause::new().filter(Filter::matching(record! { "views" => 5 })),
            );
        assert_eq!(query.descriptor().with.len(), 1);

        let rows = query.all().unwrap();
        let posts = rows[0].get("posts").and_then(Value::as_array).unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[test]
    fn test_aggregate() {
        let (schema, state) = blog();
        let result = builder(&schema, &state)
            .from("posts")
            .filter_eq(record! { "author_id" => 1 })
            .limit(1)
            .aggregate([
                ("n", Aggregation::count()),
                ("total", Aggregation::sum("views")),
                ("top", Aggregation::max("views")),
            ])
            .unwrap();
        assert_eq!(result["n"], Some(2.0));
        assert_eq!(result["total"], Some(15.0));
        assert_eq!(result["top"], Some(10.0));
    }
}
