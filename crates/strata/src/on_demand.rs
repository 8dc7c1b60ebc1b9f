//! On-demand mode: storage is the source of truth.
//!
//! No snapshot is held between calls. Each query reads through the adapter;
//! each mutation reads, applies the change and writes back what changed.
//!
//! ```text
//!   insert/update/delete
//!        │
//!        ▼
//!   adapter.read ──► engine op ──► adapter.write_changes(before, after)
//!                                   (skipped when nothing changed)
//! ```

use std::sync::Arc;

use tracing::debug;

use strata_common::error::{StrataError, StrataResult};
use strata_common::types::Record;
use strata_engine::{
    create_empty_state, delete, insert, update, DatabaseState, Filter, MutationResult, Schema,
};
use strata_storage::StorageAdapter;

use crate::query::{QueryBuilder, Source};

/// A database that reads and writes storage on every call.
///
/// Concurrent writers are not coordinated: the last write wins.
#[derive(Debug, Clone)]
pub struct OnDemandDatabase {
    schema: Arc<Schema>,
    adapter: Arc<dyn StorageAdapter>,
}

impl OnDemandDatabase {
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

    /// Not available in on-demand mode.
    ///
    /// # Errors
    ///
    /// Always returns `E400`.
    pub fn read(&self) -> StrataResult<DatabaseState> {
        Err(StrataError::not_supported("read"))
    }

    /// Not available in on-demand mode.
    ///
    /// # Errors
    ///
    /// Always returns `E400`.
    pub fn write(&self, _state: &DatabaseState) -> StrataResult<()> {
        Err(StrataError::not_supported("write"))
    }

    /// Starts a query. It reads storage when run.
    pub fn query(&self) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.schema, Source::Storage(self.adapter.as_ref()))
    }

    /// Inserts records into `table`.
    pub fn insert(&self, table: &str, values: Vec<Record>) -> StrataResult<Vec<Record>> {
        self.apply(|state, schema| insert(state, schema, table, values))
    }

    /// Inserts one record into `table`.
    pub fn insert_one(&self, table: &str, value: Record) -> StrataResult<Record> {
        let mut inserted = self.insert(table, vec![value])?;
        Ok(inserted.pop().unwrap_or_default())
    }

    /// Starts an update of `table`.
    pub fn update(&self, table: &str) -> OnDemandUpdate<'_> {
        OnDemandUpdate {
            db: self,
            table: table.to_string(),
        }
    }

    /// Starts a delete from `table`.
    pub fn delete(&self, table: &str) -> OnDemandDelete<'_> {
        OnDemandDelete {
            db: self,
            table: table.to_string(),
        }
    }

    /// Runs one read-modify-write cycle.
    fn apply<F>(&self, op: F) -> StrataResult<Vec<Record>>
    where
        F: FnOnce(&DatabaseState, &Schema) -> MutationResult,
    {
        let before = self.adapter.read(&self.schema)?;
        let (after, affected) = op(&before, &self.schema)?;
        if after.is_same(&before) {
            debug!("Nothing changed, skipping write");
        } else {
            self.adapter.write_changes(&before, &after, &self.schema)?;
        }
        Ok(affected)
    }
}

/// First step of an on-demand update: the new values.
#[derive(Debug)]
#[must_use]
pub struct OnDemandUpdate<'a> {
    db: &'a OnDemandDatabase,
    table: String,
}

impl<'a> OnDemandUpdate<'a> {
    /// Columns to write into every matching record.
    pub fn set(self, data: Record) -> OnDemandUpdateSet<'a> {
        OnDemandUpdateSet {
            db: self.db,
            table: self.table,
            data,
        }
    }
}

/// Second step of an on-demand update: which records.
#[derive(Debug)]
#[must_use]
pub struct OnDemandUpdateSet<'a> {
    db: &'a OnDemandDatabase,
    table: String,
    data: Record,
}

impl OnDemandUpdateSet<'_> {
    /// Updates records for which `predicate` returns true.
    pub fn filter<F>(self, predicate: F) -> StrataResult<Vec<Record>>
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.filter_by(Filter::new(predicate))
    }

    /// Updates records whose columns equal every column of `partial`.
    pub fn filter_eq(self, partial: Record) -> StrataResult<Vec<Record>> {
        self.filter_by(Filter::matching(partial))
    }

    /// Updates records accepted by `filter`.
    pub fn filter_by(self, filter: Filter) -> StrataResult<Vec<Record>> {
        let Self { db, table, data } = self;
        db.apply(|state, schema| update(state, schema, &table, &data, &filter))
    }
}

/// An on-demand delete awaiting its filter.
#[derive(Debug)]
#[must_use]
pub struct OnDemandDelete<'a> {
    db: &'a OnDemandDatabase,
    table: String,
}

impl OnDemandDelete<'_> {
    /// Deletes records for which `predicate` returns true.
    pub fn filter<F>(self, predicate: F) -> StrataResult<Vec<Record>>
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        self.filter_by(Filter::new(predicate))
    }

    /// Deletes records whose columns equal every column of `partial`.
    pub fn filter_eq(self, partial: Record) -> StrataResult<Vec<Record>> {
        self.filter_by(Filter::matching(partial))
    }

    /// Deletes records accepted by `filter`.
    pub fn filter_by(self, filter: Filter) -> StrataResult<Vec<Record>> {
        let table = self.table;
        self.db
            .apply(|state, schema| delete(state, schema, &table, &filter))
    }
}
