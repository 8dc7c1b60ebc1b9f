//! # Strata
//!
//! An embedded, file-persisted relational table store.
//!
//! Tables are declared in a [`Schema`]; data lives in an immutable
//! [`DatabaseState`] snapshot persisted by a [`StorageAdapter`]. The API
//! comes in two operating modes:
//!
//! - [`Database`] (in-memory): the caller holds the snapshot, every
//!   mutation returns the next one, and the caller decides when to write.
//! - [`OnDemandDatabase`]: every call goes through storage.
//!
//! [`create_database`] picks the mode the adapter asks for.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │            Database / OnDemandDatabase  (strata)              │
//! │      query(..).from(t)   insert   update(..).set   delete     │
//! └───────────────┬─────────────────────────────────┬────────────┘
//!                 │                                 │
//!      ┌──────────▼──────────┐           ┌──────────▼──────────┐
//!      │    strata-engine    │           │   strata-storage    │
//!      │ query / aggregate / │           │ single / multi /    │
//!      │ mutate / cascade    │           │ per-record / memory │
//!      └──────────┬──────────┘           └──────────┬──────────┘
//!                 └───────────────┬─────────────────┘
//!                      ┌──────────▼──────────┐
//!                      │    strata-common    │
//!                      │ Value, errors, config│
//!                      └─────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use strata::{create_file_adapter, record, schema, AdapterConfig, Database, Schema};
//!
//! let schema = Schema::builder()
//!     .table("users", [("id", schema::id()), ("email", schema::string().unique())])
//!     .build();
//! let adapter = create_file_adapter(&AdapterConfig::single_file("./db.json"))?;
//! let db = Database::new(schema, adapter);
//!
//! let state = db.read()?;
//! let (state, _) = db.insert(&state, "users", vec![record! { "email" => "ann@example.com" }])?;
//! db.write(&state)?;
//! # Ok::<(), strata::StrataError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod database;
mod on_demand;
mod query;

pub use database::{Database, DeleteBuilder, UpdateBuilder, UpdateSet};
pub use on_demand::{OnDemandDatabase, OnDemandDelete, OnDemandUpdate, OnDemandUpdateSet};
pub use query::{QueryBuilder, TableQuery};

pub use strata_common::config::{AdapterConfig, AdapterMode, Format, Strategy};
pub use strata_common::{record, ErrorCode, Record, StrataError, StrataResult, Timestamp, Value};
pub use strata_engine::schema::{self, OnDelete, RelationDefinition, Schema, TableSchema};
pub use strata_engine::{
    AggregateFunc, Aggregation, DatabaseState, FieldRef, Filter, TableMeta, TableState, WithClause,
};
pub use strata_storage::{
    create_file_adapter, MemoryAdapter, MultiFileAdapter, PerRecordAdapter, SingleFileAdapter,
    StorageAdapter,
};

use std::sync::Arc;

use tracing::info;

/// A database in whichever mode its adapter asked for.
#[derive(Debug, Clone)]
pub enum DbContext {
    /// Caller-held snapshots.
    InMemory(Database),
    /// Storage on every call.
    OnDemand(OnDemandDatabase),
}

impl DbContext {
    /// The operating mode.
    pub fn mode(&self) -> AdapterMode {
        match self {
            DbContext::InMemory(_) => AdapterMode::InMemory,
            DbContext::OnDemand(_) => AdapterMode::OnDemand,
        }
    }

    /// Returns the in-memory database, if that is the mode.
    pub fn into_in_memory(self) -> Option<Database> {
        match self {
            DbContext::InMemory(db) => Some(db),
            DbContext::OnDemand(_) => None,
        }
    }

    /// Returns the on-demand database, if that is the mode.
    pub fn into_on_demand(self) -> Option<OnDemandDatabase> {
        match self {
            DbContext::OnDemand(db) => Some(db),
            DbContext::InMemory(_) => None,
        }
    }
}

/// Creates a database in the mode reported by `adapter`.
pub fn create_database(schema: Schema, adapter: impl StorageAdapter + 'static) -> DbContext {
    let schema = Arc::new(schema);
    let adapter: Arc<dyn StorageAdapter> = Arc::new(adapter);
    let mode = adapter.mode();
    info!("Opening database in {:?} mode", mode);

    match mode {
        AdapterMode::InMemory => DbContext::InMemory(Database::from_parts(schema, adapter)),
        AdapterMode::OnDemand => DbContext::OnDemand(OnDemandDatabase::from_parts(schema, adapter)),
    }
}
