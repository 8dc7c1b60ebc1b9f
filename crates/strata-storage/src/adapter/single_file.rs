//! The whole database in one file.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use strata_common::config::AdapterMode;
use strata_common::error::StrataResult;
use strata_engine::schema::Schema;
use strata_engine::state::DatabaseState;

use super::{corrupt, parse_file, StorageAdapter};
use crate::document::{state_from_json, state_to_json};
use crate::fs::write_atomic;
use crate::serializer::{JsonSerializer, Serializer};

/// Stores every table in a single document.
///
/// Always runs in in-memory mode: reading one table means reading them all.
#[derive(Debug)]
pub struct SingleFileAdapter {
    path: PathBuf,
    serializer: Box<dyn Serializer>,
    sync_writes: bool,
}

impl SingleFileAdapter {
    /// Creates an adapter for the JSON file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            serializer: Box::new(JsonSerializer),
            sync_writes: true,
        }
    }

    /// Replaces the serializer.
    #[must_use]
    pub fn with_serializer(mut self, serializer: Box<dyn Serializer>) -> Self {
        self.serializer = serializer;
        self
    }

    /// Sets whether writes are flushed before rename.
    #[must_use]
    pub fn with_sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageAdapter for SingleFileAdapter {
    fn read(&self, schema: &Schema) -> StrataResult<DatabaseState> {
        let Some(doc) = parse_file(&self.path, self.serializer.as_ref())? else {
            info!("No database file at {}, starting empty", self.path.display());
            return Ok(DatabaseState::empty_for(schema));
        };

        let state = state_from_json(doc, schema)
            .map_err(|e| corrupt(&self.path, self.serializer.as_ref(), &e))?;
        debug!("Read {} table(s) from {}", state.len(), self.path.display());
        Ok(state)
    }

    fn write(&self, state: &DatabaseState, _schema: &Schema) -> StrataResult<()> {
        let text = self.serializer.stringify(&state_to_json(state))?;
        write_atomic(&self.path, &text, self.sync_writes)?;
        debug!("Wrote {} table(s) to {}", state.len(), self.path.display());
        Ok(())
    }

    fn mode(&self) -> AdapterMode {
        AdapterMode::InMemory
    }
}
