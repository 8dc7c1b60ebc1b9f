//! Database error types.
//!
//! Provides the error type shared by the engine, the storage adapters and
//! the database context.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for categorizing errors.
///
/// The numeric value doubles as the public `E`-code: the high byte is the
/// category, the low byte the index within it, so `0x0300` is `E300`.
/// These codes are stable across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum ErrorCode {
    // Configuration errors (0x0100 - 0x01FF)
    /// Invalid storage strategy configuration.
    InvalidStrategy = 0x0100,
    /// A storage file could not be parsed.
    CorruptFile = 0x0103,
    /// On-demand mode used with a strategy that cannot support it.
    OnDemandStrategy = 0x0104,
    /// Format not supported by the selected strategy.
    UnsupportedFormat = 0x0105,

    // Operation errors (0x0200 - 0x02FF)
    /// Table not present in the database state.
    TableNotFound = 0x0200,
    /// Table not present in the schema.
    SchemaNotFound = 0x0201,
    /// Per-record storage requires an id column.
    MissingIdColumn = 0x0202,
    /// Aggregation requires a column.
    AggregationColumnMissing = 0x0203,

    // Validation errors (0x0300 - 0x03FF)
    /// Unique constraint violated.
    UniqueViolation = 0x0300,
    /// String shorter than its minimum length.
    StringTooShort = 0x0301,
    /// String longer than its maximum length.
    StringTooLong = 0x0302,
    /// String is not a valid email address.
    InvalidEmail = 0x0303,
    /// Number below its minimum.
    NumberTooSmall = 0x0304,
    /// Number above its maximum.
    NumberTooLarge = 0x0305,

    // Mode errors (0x0400 - 0x04FF)
    /// Method not available in the current operating mode.
    NotSupported = 0x0400,

    // Storage errors (0x0500 - 0x05FF)
    /// General I/O error.
    Io = 0x0500,
    /// Document (de)serialization failed.
    Serialization = 0x0501,
}

impl ErrorCode {
    /// Returns the numeric code.
    #[inline]
    #[must_use]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }

    /// Returns the error category name.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match (*self as u16) >> 8 {
            0x01 => "Configuration",
            0x02 => "Operation",
            0x03 => "Validation",
            0x04 => "Mode",
            0x05 => "Storage",
            _ => "Unknown",
        }
    }

    /// Returns the public code name, e.g. `E300`.
    #[must_use]
    pub fn code_name(&self) -> String {
        format!("E{:03X}", self.as_u16())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code_name())
    }
}

/// The main error type for Strata.
///
/// Every fallible operation returns this error. Mutations that fail leave
/// no partial state behind; the caller keeps the snapshot it started from.
///
/// # Example
///
/// ```rust
/// use strata_common::error::{StrataError, StrataResult};
///
/// fn lookup(table: &str) -> StrataResult<()> {
///     Err(StrataError::TableNotFound { table: table.to_string() })
/// }
///
/// assert_eq!(lookup("users").unwrap_err().code().code_name(), "E200");
/// ```
#[derive(Debug, Error)]
pub enum StrataError {
    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Invalid adapter configuration.
    #[error("{message}")]
    InvalidConfig {
        /// Which configuration rule was broken.
        code: ErrorCode,
        /// Error message.
        message: String,
    },

    /// Aggregation other than `count` issued without a column.
    #[error("Aggregation `{aggregation}` requires a column.")]
    AggregationColumnMissing {
        /// The aggregation kind.
        aggregation: String,
    },

    /// Per-record storage used with a table lacking an id column.
    #[error("Table \"{table}\" must have an 'id' column for 'per-record' storage.")]
    MissingIdColumn {
        /// The offending table.
        table: String,
    },

    /// Method not supported in the current mode.
    #[error("The method '{method}' is not supported in 'on-demand' mode.")]
    NotSupported {
        /// The rejected method.
        method: String,
    },

    // ==========================================================================
    // Lookup Errors
    // ==========================================================================
    /// Table not found in the database state.
    #[error("Table \"{table}\" does not exist in the database state.")]
    TableNotFound {
        /// The missing table.
        table: String,
    },

    /// Table not found in the schema.
    #[error("Schema for table \"{table}\" not found.")]
    SchemaNotFound {
        /// The missing table.
        table: String,
    },

    // ==========================================================================
    // Validation Errors
    // ==========================================================================
    /// A column constraint was violated.
    #[error("Validation Error: {message}")]
    Validation {
        /// The violated constraint.
        code: ErrorCode,
        /// The offending column.
        column: String,
        /// Human-readable description.
        message: String,
    },

    // ==========================================================================
    // Storage Errors
    // ==========================================================================
    /// I/O error from the underlying system.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// A storage file could not be parsed.
    #[error(
        "Failed to parse file at \"{}\". It may be corrupt or not a valid {format} file. Original error: {details}",
        path.display()
    )]
    Corrupt {
        /// Path of the unreadable file.
        path: PathBuf,
        /// Expected file format.
        format: String,
        /// Parser error message.
        details: String,
    },

    /// Serialization of a document failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },
}

impl StrataError {
    /// Returns the error code for this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidConfig { code, .. } | Self::Validation { code, .. } => *code,
            Self::AggregationColumnMissing { .. } => ErrorCode::AggregationColumnMissing,
            Self::MissingIdColumn { .. } => ErrorCode::MissingIdColumn,
            Self::NotSupported { .. } => ErrorCode::NotSupported,
            Self::TableNotFound { .. } => ErrorCode::TableNotFound,
            Self::SchemaNotFound { .. } => ErrorCode::SchemaNotFound,
            Self::Io { .. } => ErrorCode::Io,
            Self::Corrupt { .. } => ErrorCode::CorruptFile,
            Self::Serialization { .. } => ErrorCode::Serialization,
        }
    }

    /// Returns true if this error is a constraint violation.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns true if this error means a table is unknown.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TableNotFound { .. } | Self::SchemaNotFound { .. }
        )
    }

    /// Creates a validation error.
    #[must_use]
    pub fn validation(
        code: ErrorCode,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Validation {
            code,
            column: column.into(),
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[must_use]
    pub fn invalid_config(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            code,
            message: message.into(),
        }
    }

    /// Creates a table-not-found error.
    #[must_use]
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// Creates a schema-not-found error.
    #[must_use]
    pub fn schema_not_found(table: impl Into<String>) -> Self {
        Self::SchemaNotFound {
            table: table.into(),
        }
    }

    /// Creates a not-supported error.
    #[must_use]
    pub fn not_supported(method: impl Into<String>) -> Self {
        Self::NotSupported {
            method: method.into(),
        }
    }
}

impl From<serde_json::Error> for StrataError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
