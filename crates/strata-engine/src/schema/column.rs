//! Column definitions and the helpers that build them.

use std::fmt;
use std::sync::Arc;

use strata_common::types::Value;

/// Kind of value a column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Engine-assigned primary key.
    Id,
    /// String column.
    String,
    /// Number column.
    Number,
    /// Boolean column.
    Boolean,
    /// Date column.
    Date,
    /// Arbitrary nested object.
    Object,
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Id => "id",
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Object => "object",
        };
        f.write_str(name)
    }
}

/// How an `id` column gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PkStrategy {
    /// `meta.last_id + 1`.
    AutoIncrement,
    /// A fresh random v4 UUID string.
    Uuid,
}

/// Engine-managed timestamp columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagedTimestamp {
    /// Set once on insert.
    CreatedAt,
    /// Set on insert, refreshed on every update.
    UpdatedAt,
    /// Null until the record is soft-deleted.
    DeletedAt,
}

/// String formats understood by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    /// `local@domain.tld`; enforced.
    Email,
    /// Informational only.
    Uuid,
    /// Informational only.
    Url,
}

/// Default applied to a column left unset on insert.
#[derive(Clone)]
pub enum DefaultValue {
    /// The same value for every record.
    Static(Value),
    /// Called once per inserted record.
    Factory(Arc<dyn Fn() -> Value + Send + Sync>),
}

impl DefaultValue {
    /// Produces the value for one record.
    pub fn produce(&self) -> Value {
        match self {
            DefaultValue::Static(value) => value.clone(),
            DefaultValue::Factory(factory) => factory(),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            DefaultValue::Factory(_) => f.write_str("Factory(..)"),
        }
    }
}

/// Column constraints and behaviors.
#[derive(Debug, Clone, Default)]
pub struct ColumnOptions {
    /// No two records may hold equal values.
    pub unique: bool,
    /// Value applied when the column is unset on insert.
    pub default: Option<DefaultValue>,
    /// Minimum string length or number value.
    pub min: Option<f64>,
    /// Maximum string length or number value.
    pub max: Option<f64>,
    /// String format.
    pub format: Option<StringFormat>,
    /// Key strategy for `id` columns.
    pub pk_strategy: Option<PkStrategy>,
    /// Managed timestamp kind.
    pub managed: Option<ManagedTimestamp>,
    /// The column may be absent. Informational.
    pub optional: bool,
}

/// A column: its type plus options.
#[derive(Debug, Clone)]
pub struct ColumnDefinition {
    /// Value kind.
    pub data_type: DataType,
    /// Constraints and behaviors.
    pub options: ColumnOptions,
}

impl ColumnDefinition {
    /// Creates a column with no options.
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            options: ColumnOptions::default(),
        }
    }

    /// Marks the column unique.
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.options.unique = true;
        self
    }

    /// Sets a static default.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.options.default = Some(DefaultValue::Static(value.into()));
        self
    }

    /// Sets a default computed per record.
    #[must_use]
    pub fn with_default_fn<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        self.options.default = Some(DefaultValue::Factory(Arc::new(factory)));
        self
    }

    /// Sets the minimum length (strings) or value (numbers).
    #[must_use]
    pub fn with_min(mut self, min: f64) -> Self {
        self.options.min = Some(min);
        self
    }

    /// Sets the maximum length (strings) or value (numbers).
    #[must_use]
    pub fn with_max(mut self, max: f64) -> Self {
        self.options.max = Some(max);
        self
    }

    /// Sets the string format.
    #[must_use]
    pub fn with_format(mut self, format: StringFormat) -> Self {
        self.options.format = Some(format);
        self
    }

    /// Marks the column optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.options.optional = true;
        self
    }

    /// Returns true for primary key columns.
    pub fn is_id(&self) -> bool {
        self.data_type == DataType::Id
    }

    /// Returns the key strategy, if this is an id column.
    pub fn pk_strategy(&self) -> Option<PkStrategy> {
        if self.is_id() {
            Some(self.options.pk_strategy.unwrap_or(PkStrategy::AutoIncrement))
        } else {
            None
        }
    }

    /// Returns the managed timestamp kind, if any.
    pub fn managed(&self) -> Option<ManagedTimestamp> {
        self.options.managed
    }

    fn managed_as(mut self, kind: ManagedTimestamp) -> Self {
        self.options.managed = Some(kind);
        self
    }

    fn keyed_by(mut self, strategy: PkStrategy) -> Self {
        self.options.pk_strategy = Some(strategy);
        self.options.unique = true;
        self
    }
}

// =============================================================================
// Column Helpers
// =============================================================================

/// Auto-incrementing numeric primary key.
pub fn id() -> ColumnDefinition {
    ColumnDefinition::new(DataType::Id).keyed_by(PkStrategy::AutoIncrement)
}

/// UUID string primary key.
pub fn uuid() -> ColumnDefinition {
    ColumnDefinition::new(DataType::Id)
        .keyed_by(PkStrategy::Uuid)
        .with_format(StringFormat::Uuid)
}

/// String column.
pub fn string() -> ColumnDefinition {
    ColumnDefinition::new(DataType::String)
}

/// Number column.
pub fn number() -> ColumnDefinition {
    ColumnDefinition::new(DataType::Number)
}

/// Boolean column.
pub fn boolean() -> ColumnDefinition {
    ColumnDefinition::new(DataType::Boolean)
}

/// Date column.
pub fn date() -> ColumnDefinition {
    ColumnDefinition::new(DataType::Date)
}

/// Nested object column.
pub fn object() -> ColumnDefinition {
    ColumnDefinition::new(DataType::Object)
}

/// Date column set to the insertion time.
pub fn created_at() -> ColumnDefinition {
    date().managed_as(ManagedTimestamp::CreatedAt)
}

/// Date column set on insert and refreshed on every update.
pub fn updated_at() -> ColumnDefinition {
    date().managed_as(ManagedTimestamp::UpdatedAt)
}

/// Nullable date column; its presence turns deletes into soft deletes.
pub fn deleted_at() -> ColumnDefinition {
    date()
        .managed_as(ManagedTimestamp::DeletedAt)
        .with_default(Value::Null)
}
