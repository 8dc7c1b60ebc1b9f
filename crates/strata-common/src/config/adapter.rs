//! Storage adapter configuration structures.
//!
//! These structures decide where and how a database is persisted: the file
//! format, the on-disk layout (strategy), and whether the database keeps a
//! caller-held snapshot in memory or goes to disk on every call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::constants::{JSON_EXTENSION, YAML_EXTENSION};
use crate::error::{ErrorCode, StrataError, StrataResult};

/// Serialization format for storage files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// Block-style YAML.
    Yaml,
}

impl Format {
    /// File extension for this format, without the leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Format::Json => JSON_EXTENSION,
            Format::Yaml => YAML_EXTENSION,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// On-disk layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Strategy {
    /// The whole database in one file.
    SingleFile {
        /// Path of the database file.
        path: PathBuf,
    },
    /// One file per table inside a directory.
    MultiFile {
        /// Directory holding `<table>.<ext>` files.
        dir: PathBuf,
    },
    /// One file per record, grouped in a directory per table.
    PerRecord {
        /// Directory holding one sub-directory per table.
        dir: PathBuf,
    },
}

impl Strategy {
    /// Short name used in logs and messages.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Strategy::SingleFile { .. } => "single-file",
            Strategy::MultiFile { .. } => "multi-file",
            Strategy::PerRecord { .. } => "per-record",
        }
    }
}

/// Operating mode of a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdapterMode {
    /// The caller holds the snapshot and decides when to read and write.
    #[default]
    InMemory,
    /// Every operation reads from and writes back to storage.
    OnDemand,
}

/// File adapter configuration.
///
/// # Example
///
/// ```rust
/// use strata_common::config::{AdapterConfig, AdapterMode};
///
/// let config = AdapterConfig::multi_file("./data").on_demand();
/// assert_eq!(config.mode, AdapterMode::OnDemand);
/// assert!(config.validate().is_ok());
///
/// let bad = AdapterConfig::single_file("./db.json").on_demand();
/// assert!(bad.validate().is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// File format.
    #[serde(default)]
    pub format: Format,

    /// On-disk layout.
    pub strategy: Strategy,

    /// Operating mode.
    #[serde(default)]
    pub mode: AdapterMode,

    /// Flush file contents to disk before the atomic rename.
    /// Default: true
    #[serde(default = "default_sync_writes")]
    pub sync_writes: bool,
}

fn default_sync_writes() -> bool {
    true
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::single_file("./db.json")
    }
}

impl AdapterConfig {
    /// Single-file layout at `path`.
    #[must_use]
    pub fn single_file(path: impl Into<PathBuf>) -> Self {
        Self::with_strategy(Strategy::SingleFile { path: path.into() })
    }

    /// One file per table under `dir`.
    #[must_use]
    pub fn multi_file(dir: impl Into<PathBuf>) -> Self {
        Self::with_strategy(Strategy::MultiFile { dir: dir.into() })
    }

    /// One file per record under `dir`.
    #[must_use]
    pub fn per_record(dir: impl Into<PathBuf>) -> Self {
        Self::with_strategy(Strategy::PerRecord { dir: dir.into() })
    }

    fn with_strategy(strategy: Strategy) -> Self {
        Self {
            format: Format::default(),
            strategy,
            mode: AdapterMode::default(),
            sync_writes: default_sync_writes(),
        }
    }

    /// Switches to on-demand mode.
    #[must_use]
    pub fn on_demand(mut self) -> Self {
        self.mode = AdapterMode::OnDemand;
        self
    }

    /// Sets the file format.
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Sets whether writes are flushed before rename.
    #[must_use]
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Creates a configuration for testing: no fsync.
    #[must_use]
    pub fn for_testing(strategy: Strategy) -> Self {
        Self::with_strategy(strategy).with_sync_writes(false)
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> StrataResult<()> {
        if self.mode == AdapterMode::OnDemand
            && matches!(self.strategy, Strategy::SingleFile { .. })
        {
            return Err(StrataError::invalid_config(
                ErrorCode::OnDemandStrategy,
                "The 'on-demand' mode requires the 'multi-file' or 'per-record' storage strategy.",
            ));
        }

        let empty = match &self.strategy {
            Strategy::SingleFile { path } => path.as_os_str().is_empty(),
            Strategy::MultiFile { dir } | Strategy::PerRecord { dir } => {
                dir.as_os_str().is_empty()
            }
        };
        if empty {
            return Err(StrataError::invalid_config(
                ErrorCode::InvalidStrategy,
                "Invalid storage strategy configuration.",
            ));
        }

        Ok(())
    }
}
