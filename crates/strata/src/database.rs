//! In-memory mode: the caller holds the snapshot.
//!
//! Every operation takes a [`DatabaseState`] and mutations return the next
//! one. Nothing touches storage until [`Database::write`].

use std::sync::Arc;

use tracing::info;

use strata_common::error::StrataResult;
use strata_common::types::Record;
use strata_engine::{
    create_empty_state, delete, insert, update, DatabaseState, Filter, MutationResult, Schema,
};
use strata_storage::StorageAdapter;

use crate::query::{QueryBuilder, Source};

/// A database whose snapshot is held by the caller.
///
/// # Example
///
/// ```rust
/// use strata::{record, schema, Database, MemoryAdapter, Schema};
///
/// let schema = Schema::builder()
///     .table("users", [("id", schema::id()), ("name", schema::string())])
///     .build();
/// let db = Database::new(schema, MemoryAdapter::new());
///
/// let state = db.read()?;
/// let (state, ann) = db.insert_one(&state, "users", record! { "name" => "Ann" })?;
/// let (state, _) = db
///     .update(&state, "users")
///     .set(record! { "name" => "Anna" })
///     .filter_eq(record! { "id" => 1 })?;
/// db.write(&state)?;
///
/// let users = db.query(&state).from("users").all()?;
/// assert_eq!(users.len(), 1);
/// assert_eq!(ann.get("id"), users[0].get("id"));
/// # Ok::<(), strata::StrataError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Database {
    schema: Arc<Schema>,
    adapter: Arc<dyn StorageAdapter>,
}

impl Database {
    /// Creates a database over `adapter`.
    pub fn new(schema: Schema, adapter: impl StorageAdapter + 'static) -> Self {
        Self::from_parts(Arc::new(schema), Arc::new(adapter))
    }

    pub(crate) fn from_parts(schema: Arc<Schema>, adapter: Arc<dyn StorageAdapter>) -> Self {
        Self { schema, adapter }
    }

    /// The schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The storage adapter.
    pub fn adapter(&self) -> &dyn StorageAdapter {
        self.adapter.as_ref()
    }

    /// Returns a state with every schema table empty.
    pub fn create_empty_state(&self) -> DatabaseState {
        create_empty_state(&self.schema)
    }

    /// Loads the stored snapshot.
    pub fn read(&self) -> StrataResult<DatabaseState> {
        let state = self.adapter.read(&self.schema)?;
        info!("Loaded {} table(s)", state.len());
        Ok(state)
    }

    /// Persists `state`.
    pub fn write(&self, state: &DatabaseState) -> StrataResult<()> {
        self.adapter.write(state, &self.schema)?;
        info!("Persisted {} table(s)", state.len());
        Ok(())
    }

    /// Starts a query against `state`.
    pub fn query<'a>(&'a self, state: &'a DatabaseState) -> QueryBuilder<'a> {
        QueryBuilder::new(&self.schema, Source::Snapshot(state))
    }

    /// Inserts records into `table`.
    pub fn insert(&self, state: &DatabaseState, table: &str, values: Vec<Record>) -> MutationResult {
        insert(state, &self.schema, table, values)
    }

    /// Inserts one record into `table`.
    pub fn insert_one(
        &self,
        state: &DatabaseState,
        table: &str,
        value: Record,
    ) -> StrataResult<(DatabaseState, Record)> {
        let (next, mut inserted) = insert(state, &self.schema, table, vec![value])?;
        Ok((next, inserted.pop().unwrap_or_default()))
    }

    /// Starts an update of `table`.
    pub fn update<'a>(&'a self, state: &'a DatabaseState, table: &str) -> UpdateBuilder<'a> {
        UpdateBuilder {
            db: self,
            state,
            table: table.to_string(),
        }
    }

    /// Starts a delete from `table`.
    pub fn delete<'a>(&'a self, state: &'a DatabaseState, table: &str) -> DeleteBuilder<'a> {
        DeleteBuilder {
            db: self,
            state,
            table: table.to_string(),
        }
    }
}

/// First step of an update: the new values.
#[derive(Debug)]
#[must_use]
pub struct UpdateBuilder<'a> {
    db: &'a Database,
    state: &'a DatabaseState,
    table: String,
}

impl<'a> UpdateBuilder<'a> {
    /// Columns to write into every matching record.
    pub fn set(self, data: Record) -> UpdateSet<'a> {
        UpdateSet {
            builder: self,
            data,
        }
    }
}

/// Second step of an update: which records.
#[derive(Debug)]
#[must_use]
pub struct UpdateSet<'a> {
    builder: UpdateBuilder<'a>,
    data: Record,
}

impl UpdateSet<'_> {
    /// Updates records for which `predicate` returns true.
    pub fn filter<F>(self, predicate: F) -> MutationResult
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.filter_by(Filter::new(predicate))
    }

    /// Updates records whose columns equal every column of `partial`.
    pub fn filter_eq(self, partial: Record) -> MutationResult {
        self.filter_by(Filter::matching(partial))
    }

    /// Updates records accepted by `filter`.
    pub fn filter_by(self, filter: Filter) -> MutationResult {
        let UpdateBuilder { db, state, table } = self.builder;
        update(state, &db.schema, &table, &self.data, &filter)
    }
}

/// A delete awaiting its filter.
#[derive(Debug)]
#[must_use]
pub struct DeleteBuilder<'a> {
    db: &'a Database,
    state: &'a DatabaseState,
    table: String,
}

impl DeleteBuilder<'_> {
    /// Deletes records for which `predicate` returns true.
    pub fn filter<F>(self, predicate: F) -> MutationResult
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.filter_by(Filter::new(predicate))
    }

    /// Deletes records whose columns equal every column of `partial`.
    pub fn filter_eq(self, partial: Record) -> MutationResult {
        self.filter_by(Filter::matching(partial))
    }

    /// Deletes records accepted by `filter`.
    pub fn filter_by(self, filter: Filter) -> MutationResult {
        delete(self.state, &self.db.schema, &self.table, &filter)
    }
}
