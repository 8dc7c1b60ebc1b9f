//! # strata-engine
//!
//! The operations engine for Strata.
//!
//! Everything here is a pure function over an immutable [`DatabaseState`]:
//! queries and aggregations read a snapshot, mutations return the next one.
//! The engine never performs I/O.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  query / first            aggregate          insert/update/delete
//! │  (filter → with →         (filter →          (ids, defaults,   │
//! │   paginate → select)       reduce)            validate, cascade)
//! └─────────────┬──────────────────┬─────────────────┬────────────┘
//!               │                  │                 │
//!        ┌──────▼──────┐    ┌──────▼──────┐   ┌──────▼──────┐
//!        │   resolve   │    │   filter    │   │  validation │
//!        └──────┬──────┘    └─────────────┘   └─────────────┘
//!               │
//!   ┌───────────▼────────────────────────────────────────────┐
//!   │   DatabaseState { table ──► Arc<TableState> }  + Schema │
//!   └────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use strata_common::record;
//! use strata_engine::schema::{self, Schema};
//! use strata_engine::{insert, query, DatabaseState, QueryDescriptor};
//!
//! let schema = Schema::builder()
//!     .table("users", [("id", schema::id()), ("name", schema::string())])
//!     .build();
//! let state = DatabaseState::empty_for(&schema);
//!
//! let (state, _) = insert(&state, &schema, "users", vec![record! { "name" => "Ann" }]).unwrap();
//! let rows = query(&state, &schema, &QueryDescriptor::new("users")).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod aggregate;
pub mod filter;
pub mod mutation;
pub mod query;
pub mod resolve;
pub mod schema;
pub mod state;
pub mod validation;

pub use aggregate::{aggregate, AggregateFunc, Aggregation};
pub use filter::Filter;
pub use mutation::{delete, insert, update, MutationResult};
pub use query::{first, query, FieldRef, QueryDescriptor, WithClause};
pub use resolve::resolve;
pub use schema::{RelationDefinition, Schema, TableSchema};
pub use state::{DatabaseState, TableMeta, TableState};
pub use validation::validate;

/// Creates a state with an empty table for every schema table.
pub fn create_empty_state(schema: &Schema) -> DatabaseState {
    DatabaseState::empty_for(schema)
}
