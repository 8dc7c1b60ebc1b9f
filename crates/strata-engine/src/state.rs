//! Immutable database snapshots.
//!
//! A [`DatabaseState`] maps table names to shared [`TableState`]s. Engine
//! operations never modify a state in place: a mutation copies the tables
//! it changes and shares every other table with its input.
//!
//! ```text
//!   before:  { users ──► Arc<TableState A>, posts ──► Arc<TableState B> }
//!   insert into posts
//!   after:   { users ──► Arc<TableState A>, posts ──► Arc<TableState B'> }
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use strata_common::types::Record;
use strata_common::INITIAL_LAST_ID;

use crate::schema::Schema;

/// Per-table metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableMeta {
    /// Auto-increment high-water mark. Never decreases.
    pub last_id: u64,
}

/// Records of one table, in insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableState {
    /// The records.
    pub records: Vec<Record>,
    /// Metadata.
    pub meta: TableMeta,
}

impl TableState {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            meta: TableMeta {
                last_id: INITIAL_LAST_ID,
            },
        }
    }

    /// Creates a table from existing records.
    pub fn with_records(records: Vec<Record>, last_id: u64) -> Self {
        Self {
            records,
            meta: TableMeta { last_id },
        }
    }

    /// Returns the number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if the table has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// An immutable snapshot of every table.
///
/// Cloning is cheap: it bumps a reference count.
#[derive(Debug, Clone, Default)]
pub struct DatabaseState {
    tables: Arc<BTreeMap<String, Arc<TableState>>>,
}

impl DatabaseState {
    /// Creates a state with no tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a state with an empty table for every schema table.
    pub fn empty_for(schema: &Schema) -> Self {
        let tables = schema
            .table_names()
            .map(|name| (name.to_string(), Arc::new(TableState::new())))
            .collect();
        Self {
            tables: Arc::new(tables),
        }
    }

    /// Creates a state from tables.
    pub fn from_tables<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = (String, TableState)>,
    {
        Self {
            tables: Arc::new(
                tables
                    .into_iter()
                    .map(|(name, table)| (name, Arc::new(table)))
                    .collect(),
            ),
        }
    }

    /// Looks up a table.
    pub fn table(&self, name: &str) -> Option<&TableState> {
        self.tables.get(name).map(Arc::as_ref)
    }

    /// Looks up a table and returns its shared handle.
    pub fn table_arc(&self, name: &str) -> Option<&Arc<TableState>> {
        self.tables.get(name)
    }

    /// Returns true if the table exists.
    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Iterates tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableState)> {
        self.tables.iter().map(|(n, t)| (n.as_str(), t.as_ref()))
    }

    /// Returns the number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if the state has no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Returns a new state with `name` replaced; every other table is
    /// shared with `self`.
    #[must_use]
    pub fn with_table(&self, name: &str, table: TableState) -> Self {
        let mut tables = (*self.tables).clone();
        tables.insert(name.to_string(), Arc::new(table));
        Self {
            tables: Arc::new(tables),
        }
    }

    /// Returns a state holding every schema table, adding an empty one for
    /// each table `self` lacks. Existing tables are shared. When nothing is
    /// missing the result is the same snapshot.
    #[must_use]
    pub fn covering(&self, schema: &Schema) -> Self {
        let missing: Vec<&str> = schema
            .table_names()
            .filter(|name| !self.tables.contains_key(*name))
            .collect();
        if missing.is_empty() {
            return self.clone();
        }

        let mut tables = (*self.tables).clone();
        for name in missing {
            tables.insert(name.to_string(), Arc::new(TableState::new()));
        }
        Self {
            tables: Arc::new(tables),
        }
    }

    /// Returns true if both values are the same snapshot.
    ///
    /// Update and delete return their input when nothing matched, so this
    /// detects a no-op.
    pub fn is_same(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.tables, &other.tables)
    }

    /// Returns true if both states hold the same allocation for `name`.
    pub fn shares_table(&self, other: &Self, name: &str) -> bool {
        match (self.tables.get(name), other.tables.get(name)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for DatabaseState {
    fn eq(&self, other: &Self) -> bool {
        self.is_same(other) || self.tables == other.tables
    }
}
