//! One file per table.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use strata_common::config::AdapterMode;
use strata_common::error::StrataResult;
use strata_engine::schema::Schema;
use strata_engine::state::DatabaseState;

use super::{changed_tables, corrupt, parse_file, StorageAdapter};
use crate::document::{table_from_json, table_to_json};
use crate::fs::write_atomic;
use crate::serializer::{JsonSerializer, Serializer};

/// Stores each table as `<dir>/<table>.<ext>`.
#[derive(Debug)]
pub struct MultiFileAdapter {
    dir: PathBuf,
    serializer: Box<dyn Serializer>,
    mode: AdapterMode,
    sync_writes: bool,
}

impl MultiFileAdapter {
    /// Creates an in-memory mode adapter storing JSON files under `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            serializer: Box::new(JsonSerializer),
            mode: AdapterMode::InMemory,
            sync_writes: true,
        }
    }

    /// Replaces the serializer.
    #[must_use]
    pub fn with_serializer(mut self, serializer: Box<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Sets the operating mode.
    #[must_use]
    pub fn with_mode(mut self, mode: AdapterMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sets whether writes are flushed before rename.
    #[must_use]
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Root directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `table`.
    pub fn table_path(&self, table: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", table, self.serializer.extension()))
    }
}

impl StorageAdapter for MultiFileAdapter {
    fn read(&self, schema: &Schema) -> StrataResult<DatabaseState> {
        fs::create_dir_all(&self.dir)?;

        let mut state = DatabaseState::empty_for(schema);
        for (name, table_schema) in schema.tables() {
            let path = self.table_path(name);
            let Some(doc) = parse_file(&path, self.serializer.as_ref())? else {
                continue;
            };
            let table = table_from_json(doc, Some(table_schema))
                .map_err(|e| corrupt(&path, self.serializer.as_ref(), &e))?;
            debug!("Read {} record(s) from {}", table.len(), path.display());
            state = state.with_table(name, table);
        }
        Ok(state)
    }

    fn write(&self, state: &DatabaseState, _schema: &Schema) -> StrataResult<()> {
        let names: Vec<&str> = state.tables().map(|(name, _)| name).collect();
        self.write_tables(state, &names)
    }

    fn mode(&self) -> AdapterMode {
        self.mode
    }

    fn write_changes(
        &self,
        previous: &DatabaseState,
        next: &DatabaseState,
        _schema: &Schema,
    ) -> StrataResult<()> {
        self.write_tables(next, &changed_tables(previous, next))
    }
}

impl MultiFileAdapter {
    fn write_tables(&self, state: &DatabaseState, names: &[&str]) -> StrataResult<()> {
        if names.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;

        for &name in names {
            let Some(table) = state.table(name) else {
                continue;
            };
            let text = self.serializer.stringify(&table_to_json(table))?;
            write_atomic(&self.table_path(name), &text, self.sync_writes)?;
        }
        debug!("Wrote {} table file(s) to {}", names.len(), self.dir.display());
        Ok(())
    }
}
