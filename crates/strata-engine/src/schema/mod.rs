//! Schema: tables, columns and relations.
//!
//! The schema is plain data built once at startup and read by every engine
//! operation.
//!
//! ```rust
//! use strata_engine::schema::{self, OnDelete, Schema};
//!
//! let schema = Schema::builder()
//!     .table("users", [("id", schema::id()), ("name", schema::string())])
//!     .table("posts", [("id", schema::id()), ("author_id", schema::number())])
//!     .relation("users", "posts", schema::many("posts", "id", "author_id"))
//!     .relation(
//!         "posts",
//!         "author",
//!         schema::one("users", "author_id", "id").with_on_delete(OnDelete::SetNull),
//!     )
//!     .build();
//!
//! assert!(schema.table("users").is_some());
//! assert_eq!(schema.referencing("users").count(), 1);
//! ```

mod column;
mod relation;

pub use column::{
    boolean, created_at, date, deleted_at, id, number, object, string, updated_at, uuid,
    ColumnDefinition, ColumnOptions, DataType, DefaultValue, ManagedTimestamp, PkStrategy,
    StringFormat,
};
pub use relation::{many, one, OnDelete, RelationDefinition, RelationLink};

use std::collections::BTreeMap;

/// Columns of one table, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    columns: Vec<(String, ColumnDefinition)>,
}

impl TableSchema {
    /// Creates a table schema from `(name, definition)` pairs.
    ///
    /// A later column with the same name replaces the earlier one in place.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnDefinition)>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (name, def) in columns {
            table.push(name.into(), def);
        }
        table
    }

    fn push(&mut self, name: String, def: ColumnDefinition) {
        match self.columns.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = def,
            None => self.columns.push((name, def)),
        }
    }

    /// Iterates columns in declaration order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnDefinition)> {
        self.columns.iter().map(|(n, d)| (n.as_str(), d))
    }

    /// Looks up a column.
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|(n, _)| n == name).map(|(_, d)| d)
    }

    /// Returns true if the column is declared.
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns true if no columns are declared.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Returns the first id column.
    pub fn id_column(&self) -> Option<(&str, &ColumnDefinition)> {
        self.columns().find(|(_, d)| d.is_id())
    }

    /// Iterates the id columns.
    pub fn id_columns(&self) -> impl Iterator<Item = &str> {
        self.columns().filter(|(_, d)| d.is_id()).map(|(n, _)| n)
    }

    /// Iterates the columns managed as the given timestamp kind.
    pub fn managed_columns(&self, kind: ManagedTimestamp) -> impl Iterator<Item = &str> {
        self.columns()
            .filter(move |(_, d)| d.managed() == Some(kind))
            .map(|(n, _)| n)
    }

    /// Returns the soft-delete column, if the table has one.
    pub fn deleted_at_column(&self) -> Option<&str> {
        self.managed_columns(ManagedTimestamp::DeletedAt).next()
    }

    /// Iterates the date-typed columns.
    pub fn date_columns(&self) -> impl Iterator<Item = &str> {
        self.columns()
            .filter(|(_, d)| d.data_type == DataType::Date)
            .map(|(n, _)| n)
    }
}

/// Relations of one table, by relation name.
pub type TableRelations = BTreeMap<String, RelationDefinition>;

/// The database schema.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    tables: BTreeMap<String, TableSchema>,
    relations: BTreeMap<String, TableRelations>,
}

impl Schema {
    /// Starts building a schema.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Looks up a table.
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Iterates tables in name order.
    pub fn tables(&self) -> impl Iterator<Item = (&str, &TableSchema)> {
        self.tables.iter().map(|(n, t)| (n.as_str(), t))
    }

    /// Iterates table names in order.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Returns the relations declared on a table.
    pub fn relations(&self, table: &str) -> Option<&TableRelations> {
        self.relations.get(table)
    }

    /// Looks up one relation.
    pub fn relation(&self, table: &str, name: &str) -> Option<&RelationDefinition> {
        self.relations.get(table)?.get(name)
    }

    /// Iterates every `One` relation declared on another table that targets
    /// `table`, as `(owner_table, relation)`.
    pub fn referencing<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a RelationDefinition)> + 'a {
        self.relations
            .iter()
            .filter(move |(owner, _)| owner.as_str() != table)
            .flat_map(|(owner, rels)| rels.values().map(move |rel| (owner.as_str(), rel)))
            .filter(move |(_, rel)| rel.is_one() && rel.target_table() == table)
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Adds a table.
    #[must_use]
    pub fn table<I, S>(mut self, name: &str, columns: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnDefinition)>,
        S: Into<String>,
    {
        self.schema
            .tables
            .insert(name.to_string(), TableSchema::new(columns));
        self
    }

    /// Adds a relation named `name` on `table`.
    #[must_use]
    pub fn relation(mut self, table: &str, name: &str, relation: RelationDefinition) -> Self {
        self.schema
            .relations
            .entry(table.to_string())
            .or_default()
            .insert(name.to_string(), relation);
        self
    }

    /// Finishes the schema.
    pub fn build(self) -> Schema {
        self.schema
    }
}
