//! System-wide constants for Strata.
//!
//! File names, suffixes and defaults shared by the storage adapters and the
//! database context.

// =============================================================================
// File Layout
// =============================================================================

/// Name of the per-table metadata file used by the per-record strategy.
///
/// Any file in a table directory starting with this prefix is treated as
/// metadata, never as a record.
pub const META_FILE_NAME: &str = "_meta.json";

/// Prefix identifying metadata files in a per-record table directory.
pub const META_FILE_PREFIX: &str = "_meta";

/// Suffix appended to temporary files written during an atomic replace.
pub const TEMP_FILE_SUFFIX: &str = ".tmp";

/// File extension used by the JSON serializer.
pub const JSON_EXTENSION: &str = "json";

/// File extension used by the YAML serializer.
pub const YAML_EXTENSION: &str = "yaml";

// =============================================================================
// Engine Defaults
// =============================================================================

/// Initial auto-increment high-water mark of a freshly created table.
pub const INITIAL_LAST_ID: u64 = 0;

/// Default offset applied by a query without an explicit offset.
pub const DEFAULT_QUERY_OFFSET: usize = 0;
