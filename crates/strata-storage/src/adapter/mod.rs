//! Storage adapters.
//!
//! A [`StorageAdapter`] loads a whole [`DatabaseState`] and persists one.
//! File adapters exist for each on-disk layout; [`create_file_adapter`]
//! picks one from an [`AdapterConfig`].
//!
//! ```text
//!   AdapterConfig ──validate──► create_file_adapter
//!                                     │
//!        ┌────────────────────────────┼──────────────────────────┐
//!        ▼                            ▼                          ▼
//!  SingleFileAdapter           MultiFileAdapter           PerRecordAdapter
//!  (in-memory only)         (in-memory / on-demand)    (in-memory / on-demand)
//! ```

mod memory;
mod multi_file;
mod per_record;
mod single_file;

pub use memory::MemoryAdapter;
pub use multi_file::MultiFileAdapter;
pub use per_record::PerRecordAdapter;
pub use single_file::SingleFileAdapter;

use std::fmt;
use std::path::Path;

use tracing::info;

use strata_common::config::{AdapterConfig, AdapterMode, Strategy};
use strata_common::error::{StrataError, StrataResult};
use strata_engine::schema::Schema;
use strata_engine::state::DatabaseState;

use crate::fs::read_if_exists;
use crate::serializer::{serializer_for, Serializer};

/// Reads and writes whole database snapshots.
pub trait StorageAdapter: Send + Sync + fmt::Debug {
    /// Loads the database. Tables with nothing stored are empty.
    fn read(&self, schema: &Schema) -> StrataResult<DatabaseState>;

    /// Persists the database.
    fn write(&self, state: &DatabaseState, schema: &Schema) -> StrataResult<()>;

    /// The operating mode the database context should use.
    fn mode(&self) -> AdapterMode;

    /// Persists `next` when storage currently holds `previous`.
    ///
    /// Nothing is written when both are the same snapshot. The default
    /// writes `next` in full; adapters with a file per table override this
    /// to write only the tables `next` does not share with `previous`.
    fn write_changes(
        &self,
        previous: &DatabaseState,
        next: &DatabaseState,
        schema: &Schema,
    ) -> StrataResult<()> {
        if next.is_same(previous) {
            return Ok(());
        }
        self.write(next, schema)
    }
}

impl<A: StorageAdapter + ?Sized> StorageAdapter for Box<A> {
    fn read(&self, schema: &Schema) -> StrataResult<DatabaseState> {
        (**self).read(schema)
    }

    fn write(&self, state: &DatabaseState, schema: &Schema) -> StrataResult<()> {
        (**self).write(state, schema)
    }

    fn mode(&self) -> AdapterMode {
        (**self).mode()
    }

    fn write_changes(
        &self,
        previous: &DatabaseState,
        next: &DatabaseState,
        schema: &Schema,
    ) -> StrataResult<()> {
        (**self).write_changes(previous, next, schema)
    }
}

/// Names of the tables of `next` that `previous` does not share.
fn changed_tables<'a>(previous: &DatabaseState, next: &'a DatabaseState) -> Vec<&'a str> {
    next.tables()
        .map(|(name, _)| name)
        .filter(|name| !next.shares_table(previous, name))
        .collect()
}

/// Creates the file adapter described by `config`.
///
/// # Errors
///
/// Returns `E104` for on-demand mode with the single-file strategy and
/// `E100` for an empty path.
pub fn create_file_adapter(config: &AdapterConfig) -> StrataResult<Box<dyn StorageAdapter>> {
    config.validate()?;

    let serializer = serializer_for(config.format);
    info!(
        "Creating {} adapter ({}, {:?})",
        config.strategy.name(),
        config.format,
        config.mode
    );

    let adapter: Box<dyn StorageAdapter> = match &config.strategy {
        Strategy::SingleFile { path } => Box::new(
            SingleFileAdapter::new(path)
                .with_serializer(serializer)
                .with_sync_writes(config.sync_writes),
        ),
        Strategy::MultiFile { dir } => Box::new(
            MultiFileAdapter::new(dir)
                .with_serializer(serializer)
                .with_mode(config.mode)
                .with_sync_writes(config.sync_writes),
        ),
        Strategy::PerRecord { dir } => Box::new(
            PerRecordAdapter::new(dir)
                .with_serializer(serializer)
                .with_mode(config.mode)
                .with_sync_writes(config.sync_writes),
        ),
    };
    Ok(adapter)
}

/// Reads and parses a file. A missing file is `None`; a file that does not
/// parse is reported as corrupt.
fn parse_file(path: &Path, serializer: &dyn Serializer) -> StrataResult<Option<serde_json::Value>> {
    let Some(raw) = read_if_exists(path)? else {
        return Ok(None);
    };
    serializer
        .parse(&raw)
        .map(Some)
        .map_err(|e| corrupt(path, serializer, &e))
}

fn corrupt(path: &Path, serializer: &dyn Serializer, err: &StrataError) -> StrataError {
    let details = match err {
        StrataError::Serialization { message } => message.clone(),
        other => other.to_string(),
    };
    StrataError::Corrupt {
        path: path.to_path_buf(),
        format: serializer.format().to_string(),
        details,
    }
}
