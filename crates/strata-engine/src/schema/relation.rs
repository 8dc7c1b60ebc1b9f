//! Relation definitions.
//!
//! A relation joins two tables by value equality: `owner[on] ==
//! target[references]`. `One` relations point from a foreign key to the
//! record it references; `Many` relations point from a key to every record
//! carrying it as a foreign key.

/// Referential action taken when a referenced record is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OnDelete {
    /// Delete the dependent records too.
    Cascade,
    /// Null out the dependent records' foreign key.
    SetNull,
}

/// Join columns shared by both relation kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationLink {
    /// Table holding the related records.
    pub target_table: String,
    /// Column read on the owning record.
    pub on: String,
    /// Column compared on the target records.
    pub references: String,
    /// Action on delete, if any.
    pub on_delete: Option<OnDelete>,
}

/// A named relation from one table to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationDefinition {
    /// Resolves to at most one record (first match or null).
    One(RelationLink),
    /// Resolves to every matching record.
    Many(RelationLink),
}

impl RelationDefinition {
    /// Returns the join columns.
    pub fn link(&self) -> &RelationLink {
        match self {
            RelationDefinition::One(link) | RelationDefinition::Many(link) => link,
        }
    }

    /// Returns the target table.
    pub fn target_table(&self) -> &str {
        &self.link().target_table
    }

    /// Returns the owning-side column.
    pub fn on(&self) -> &str {
        &self.link().on
    }

    /// Returns the target-side column.
    pub fn references(&self) -> &str {
        &self.link().references
    }

    /// Returns the delete action, if any.
    pub fn on_delete(&self) -> Option<OnDelete> {
        self.link().on_delete
    }

    /// Returns true for `One` relations.
    pub fn is_one(&self) -> bool {
        matches!(self, RelationDefinition::One(_))
    }

    /// Sets the delete action.
    #[must_use]
    pub fn with_on_delete(mut self, action: OnDelete) -> Self {
        match &mut self {
            RelationDefinition::One(link) | RelationDefinition::Many(link) => {
                link.on_delete = Some(action);
            }
        }
        self
    }
}

fn link(target_table: &str, on: &str, references: &str) -> RelationLink {
    RelationLink {
        target_table: target_table.to_string(),
        on: on.to_string(),
        references: references.to_string(),
        on_delete: None,
    }
}

/// One-to-one or many-to-one relation: `owner[on]` is a foreign key into
/// `target_table[references]`.
pub fn one(target_table: &str, on: &str, references: &str) -> RelationDefinition {
    RelationDefinition::One(link(target_table, on, references))
}

/// One-to-many relation: `owner[on]` is referenced by
/// `target_table[references]`.
pub fn many(target_table: &str, on: &str, references: &str) -> RelationDefinition {
    RelationDefinition::Many(link(target_table, on, references))
}
