//! In-memory adapter.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use strata_common::config::AdapterMode;
use strata_common::error::StrataResult;
use strata_engine::schema::Schema;
use strata_engine::state::DatabaseState;

use super::StorageAdapter;

/// Keeps the last written snapshot in memory.
///
/// Useful for tests and for embedding without a file system. Reads before
/// the first write return an empty state. Schema tables missing from the
/// stored snapshot read back empty.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    snapshot: Mutex<Option<DatabaseState>>,
    mode: AdapterMode,
    writes: AtomicU64,
}

impl MemoryAdapter {
    /// Creates an empty in-memory mode adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an adapter that already holds `state`.
    pub fn with_state(state: DatabaseState) -> Self {
        Self {
            snapshot: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    /// Switches to on-demand mode.
    #[must_use]
    pub fn on_demand(mut self) -> Self {
        self.mode = AdapterMode::OnDemand;
        self
    }

    /// Returns the stored snapshot, if any.
    pub fn snapshot(&self) -> Option<DatabaseState> {
        self.snapshot.lock().clone()
    }

    /// Number of writes so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }
}

impl StorageAdapter for MemoryAdapter {
    fn read(&self, schema: &Schema) -> StrataResult<DatabaseState> {
        Ok(match self.snapshot.lock().as_ref() {
            Some(state) => state.covering(schema),
            None => DatabaseState::empty_for(schema),
        })
    }

    fn write(&self, state: &DatabaseState, _schema: &Schema) -> StrataResult<()> {
        *self.snapshot.lock() = Some(state.clone());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn mode(&self) -> AdapterMode {
        self.mode
    }
}
