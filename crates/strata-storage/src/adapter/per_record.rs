//! One file per record.
//!
//! ```text
//! <dir>/
//! └── <table>/
//!     ├── _meta.json      { "lastId": 2 }
//!     ├── 1.json          record with id 1
//!     └── 2.json          record with id 2
//! ```

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use strata_common::config::AdapterMode;
use strata_common::error::{StrataError, StrataResult};
use strata_common::types::{Record, Value};
use strata_common::META_FILE_NAME;
use strata_engine::schema::{PkStrategy, Schema, TableSchema};
use strata_engine::state::{DatabaseState, TableMeta, TableState};

use super::{changed_tables, corrupt, parse_file, StorageAdapter};
use crate::document::{meta_from_json, meta_to_json, record_from_json, record_to_json};
use crate::fs::{is_meta_file, is_temp_file, list_files, read_if_exists, write_atomic};
use crate::serializer::{JsonSerializer, Serializer};

/// Stores each record as `<dir>/<table>/<id>.<ext>`.
///
/// Every table written must have an id column. Records are read back in
/// ascending id order.
#[derive(Debug)]
pub struct PerRecordAdapter {
    dir: PathBuf,
    serializer: Box<dyn Serializer>,
    mode: AdapterMode,
    sync_writes: bool,
}

impl PerRecordAdapter {
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

    /// Directory holding the files of `table`.
    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.dir.join(table)
    }

    fn record_file_name(&self, id: &Value) -> Option<String> {
        let stem = match id {
            Value::Number(_) => id.to_json().to_string(),
            Value::String(s) if !s.is_empty() => s.clone(),
            _ => return None,
        };
        Some(format!("{}.{}", stem, self.serializer.extension()))
    }

    fn is_record_file(&self, name: &str) -> bool {
        !is_meta_file(name)
            && !is_temp_file(name)
            && Path::new(name).extension().and_then(|e| e.to_str()) == Some(self.serializer.extension())
    }

    fn read_meta(&self, table_dir: &Path) -> StrataResult<TableMeta> {
        let path = table_dir.join(META_FILE_NAME);
        let Some(raw) = read_if_exists(&path)? else {
            return Ok(TableMeta::default());
        };
        match serde_json::from_str(&raw).map_err(StrataError::from).and_then(meta_from_json) {
            Ok(meta) => Ok(meta),
            Err(e) => {
                warn!("Ignoring unreadable {}: {}", path.display(), e);
                Ok(TableMeta::default())
            }
        }
    }

    fn read_table(&self, name: &str, table_schema: &TableSchema) -> StrataResult<TableState> {
        let table_dir = self.table_dir(name);
        fs::create_dir_all(&table_dir)?;

        let mut meta = self.read_meta(&table_dir)?;
        let mut records = Vec::new();
        for file in list_files(&table_dir)? {
            if is_temp_file(&file) {
                warn!("Skipping temp file {} in {}", file, table_dir.display());
                continue;
            }
            if !self.is_record_file(&file) {
                trace!("Skipping {} in {}", file, table_dir.display());
                continue;
            }

            let path = table_dir.join(&file);
            let Some(doc) = parse_file(&path, self.serializer.as_ref())? else {
                continue;
            };
            let record = record_from_json(doc, Some(table_schema))
                .map_err(|e| corrupt(&path, self.serializer.as_ref(), &e))?;
            records.push(record);
        }

        if let Some((id_column, definition)) = table_schema.id_column() {
            records.sort_by(|a, b| compare_ids(a.get(id_column), b.get(id_column)));

            if meta.last_id == 0 && definition.pk_strategy() == Some(PkStrategy::AutoIncrement) {
                meta.last_id = max_numeric_id(&records, id_column);
                if meta.last_id > 0 {
                    info!("Derived last id {} for table {}", meta.last_id, name);
                }
            }
        }

        debug!("Read {} record(s) from {}", records.len(), table_dir.display());
        Ok(TableState { records, meta })
    }

    fn write_table(&self, name: &str, table: &TableState, table_schema: &TableSchema) -> StrataResult<()> {
        let (id_column, _) = table_schema
            .id_column()
            .ok_or_else(|| StrataError::MissingIdColumn {
                table: name.to_string(),
            })?;

        let table_dir = self.table_dir(name);
        fs::create_dir_all(&table_dir)?;

        // The meta file is JSON whatever the record format.
        let meta = serde_json::to_string_pretty(&meta_to_json(table.meta))?;
        write_atomic(&table_dir.join(META_FILE_NAME), &meta, self.sync_writes)?;

        let mut current = BTreeSet::new();
        for record in &table.records {
            let Some(file) = record.get(id_column).and_then(|id| self.record_file_name(id)) else {
                warn!("Skipping record without a usable {} in table {}", id_column, name);
                continue;
            };
            let text = self.serializer.stringify(&record_to_json(record))?;
            write_atomic(&table_dir.join(&file), &text, self.sync_writes)?;
            current.insert(file);
        }

        let mut removed = 0;
        for file in list_files(&table_dir)? {
            if self.is_record_file(&file) && !current.contains(&file) {
                fs::remove_file(table_dir.join(&file))?;
                removed += 1;
            }
        }

        debug!(
            "Wrote {} record file(s) to {}, removed {}",
            current.len(),
            table_dir.display(),
            removed
        );
        Ok(())
    }
}

impl StorageAdapter for PerRecordAdapter {
    fn read(&self, schema: &Schema) -> StrataResult<DatabaseState> {
        fs::create_dir_all(&self.dir)?;

        let mut tables = Vec::new();
        for (name, table_schema) in schema.tables() {
            tables.push((name.to_string(), self.read_table(name, table_schema)?));
        }
        Ok(DatabaseState::from_tables(tables))
    }

    fn write(&self, state: &DatabaseState, schema: &Schema) -> StrataResult<()> {
        let names: Vec<&str> = state.tables().map(|(name, _)| name).collect();
        self.write_tables(state, schema, &names)
    }

    fn mode(&self) -> AdapterMode {
        self.mode
    }

    fn write_changes(
        &self,
        previous: &DatabaseState,
        next: &DatabaseState,
        schema: &Schema,
    ) -> StrataResult<()> {
        self.write_tables(next, schema, &changed_tables(previous, next))
    }
}

impl PerRecordAdapter {
    fn write_tables(&self, state: &DatabaseState, schema: &Schema, names: &[&str]) -> StrataResult<()> {
        // Check every table before touching the disk
        let mut plan = Vec::with_capacity(names.len());
        for &name in names {
            let Some(table) = state.table(name) else {
                continue;
            };
            let table_schema = schema
                .table(name)
                .ok_or_else(|| StrataError::schema_not_found(name))?;
            if table_schema.id_column().is_none() {
                return Err(StrataError::MissingIdColumn {
                    table: name.to_string(),
                });
            }
            plan.push((name, table, table_schema));
        }

        if plan.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)?;
        for (name, table, table_schema) in plan {
            self.write_table(name, table, table_schema)?;
        }
        Ok(())
    }
}

/// Numbers first in numeric order, then strings.
fn compare_ids(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x.total_cmp(y),
        (Some(Value::Number(_)), _) => Ordering::Less,
        (_, Some(Value::Number(_))) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn max_numeric_id(records: &[Record], id_column: &str) -> u64 {
    records
        .iter()
        .filter_map(|r| r.get(id_column).and_then(Value::as_f64))
        .filter(|id| *id > 0.0)
        .fold(0, |max, id| max.max(id as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::{record, ErrorCode};
    use strata_engine::schema;
    use strata_engine::{delete, insert, Filter};
    use tempfile::TempDir;

    fn schema() -> Schema {
        Schema::builder()
            .table("users", [("id", schema::id()), ("name", schema::string())])
            .table("tokens", [("id", schema::uuid()), ("value", schema::string())])
            .build()
    }

    fn adapter(tmp: &TempDir) -> PerRecordAdapter {
        PerRecordAdapter::new(tmp.path().join("data")).with_sync_writes(false)
    }

    fn seeded(schema: &Schema) -> DatabaseState {
        let (state, _) = insert(
            &DatabaseState::empty_for(schema),
            schema,
            "users",
            vec![
                record! { "name" => "Ann" },
                record! { "name" => "Ben" },
                record! { "name" => "Cid" },
            ],
        )
        .unwrap();
        state
    }

    #[test]
    fn test_layout() {
        let tmp = TempDir::new().unwrap();
        let adapter = adapter(&tmp);
        let schema = schema();
        adapter.write(&seeded(&schema), &schema).unwrap();

        let files = list_files(&adapter.table_dir("users")).unwrap();
        assert_eq!(files, vec!["1.json", "2.json", "3.json", "_meta.json"]);

        let meta = fs::read_to_string(adapter.table_dir("users").join(META_FILE_NAME)).unwrap();
        let meta: serde_json::Value = serde_json::from_str(&meta).unwrap();
        assert_eq!(meta["lastId"], 3);
    }

    #[test]
    fn test_yaml_records_keep_json_meta() {
        let tmp = TempDir::new().unwrap();
        let adapter = adapter(&tmp).with_serializer(Box::new(crate::YamlSerializer));
        let schema = schema();
        let state = seeded(&schema);
        adapter.write(&state, &schema).unwrap();

        let files = list_files(&adapter.table_dir("users")).unwrap();
        assert_eq!(files, vec!["1.yaml", "2.yaml", "3.yaml", "_meta.json"]);
        let meta = fs::read_to_string(adapter.table_dir("users").join(META_FILE_NAME)).unwrap();
        let meta: serde_json::Value = serde_json::from_str(&meta).unwrap();
        assert_eq!(meta["lastId"], 3);

        assert_eq!(adapter.read(&schema).unwrap(), state);
    }

    #[test]
    fn test_round_trip_in_id_order() {
        let tmp = TempDir::new().unwrap();
        let adapter = adapter(&tmp);
        let schema = schema();

        let mut users: Vec<Record> = (1..=12).map(|i| record! { "id" => i, "name" => "x" }).collect();
        users.reverse();
        let state = DatabaseState::empty_for(&schema)
            .with_table("users", TableState::with_records(users, 12));
        adapter.write(&state, &schema).unwrap();

        let loaded = adapter.read(&schema).unwrap();
        let ids: Vec<_> = loaded
            .table("users")
            .unwrap()
            .records
            .iter()
            .map(|r| r.get("id").and_then(Value::as_f64).unwrap())
            .collect();
        assert_eq!(ids, (1..=12).map(f64::from).collect::<Vec<_>>());
    }

    #[test]
    fn test_stale_files_removed() {
        let tmp = TempDir::new().unwrap();
        let adapter = adapter(&tmp);
        let schema = schema();
        let state = seeded(&schema);
        adapter.write(&state, &schema).unwrap();

        let (state, _) = delete(&state, &schema, "users", &Filter::matching(record! { "id" => 2 })).unwrap();
        adapter.write(&state, &schema).unwrap();

        let files = list_files(&adapter.table_dir("users")).unwrap();
        assert_eq!(files, vec!["1.json", "3.json", "_meta.json"]);
        let loaded = adapter.read(&schema).unwrap();
        assert_eq!(loaded.table("users").unwrap().meta.last_id, 3);
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_last_id_derived_without_meta() {
        let tmp = TempDir::new().unwrap();
        let adapter = adapter(&tmp);
        let schema = schema();
        adapter.write(&seeded(&schema), &schema).unwrap();
        fs::remove_file(adapter.table_dir("users").join(META_FILE_NAME)).unwrap();

        let loaded = adapter.read(&schema).unwrap();
        assert_eq!(loaded.table("users").unwrap().meta.last_id, 3);

        let (_, inserted) = insert(&loaded, &schema, "users", vec![record! { "name" => "Dee" }]).unwrap();
        assert_eq!(inserted[0].get("id"), Some(&Value::number(4)));
    }

    #[test]
    fn test_uuid_table_keeps_zero_last_id() {
        let tmp = TempDir::new().unwrap();
        let adapter = adapter(&tmp);
        let schema = schema();
        let (state, inserted) = insert(
            &DatabaseState::empty_for(&schema),
            &schema,
            "tokens",
            vec![record! { "value" => "a" }],
        )
        .unwrap();
        adapter.write(&state, &schema).unwrap();

        let id = inserted[0].get("id").and_then(Value::as_str).unwrap().to_string();
        assert!(adapter.table_dir("tokens").join(format!("{id}.json")).exists());

        let loaded = adapter.read(&schema).unwrap();
        assert_eq!(loaded.table("tokens").unwrap().meta.last_id, 0);
        assert_eq!(loaded.table("tokens").unwrap().len(), 1);
    }

    #[test]
    fn test_temp_and_foreign_files_ignored() {
        let tmp = TempDir::new().unwrap();
        let adapter = adapter(&tmp);
        let schema = schema();
        adapter.write(&seeded(&schema), &schema).unwrap();

        let dir = adapter.table_dir("users");
        fs::write(dir.join("4.json.1700000000.0.tmp"), "{ partial").unwrap();
        fs::write(dir.join("notes.txt"), "hello").unwrap();

        let loaded = adapter.read(&schema).unwrap();
        assert_eq!(loaded.table("users").unwrap().len(), 3);

        adapter.write(&loaded, &schema).unwrap();
        assert!(dir.join("notes.txt").exists());
    }

    #[test]
    fn test_unreadable_meta_falls_back() {
        let tmp = TempDir::new().unwrap();
        let adapter = adapter(&tmp);
        let schema = schema();
        adapter.write(&seeded(&schema), &schema).unwrap();
        fs::write(adapter.table_dir("users").join(META_FILE_NAME), "garbage").unwrap();

        let loaded = adapter.read(&schema).unwrap();
        assert_eq!(loaded.table("users").unwrap().meta.last_id, 3);
    }

    #[test]
    fn test_corrupt_record_file() {
        let tmp = TempDir::new().unwrap();
        let adapter = adapter(&tmp);
        let schema = schema();
        adapter.write(&seeded(&schema), &schema).unwrap();
        fs::write(adapter.table_dir("users").join("2.json"), "{").unwrap();

        let err = adapter.read(&schema).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CorruptFile);
        assert!(err.to_string().contains("2.json"));
    }

    #[test]
    fn test_table_without_id_column_rejected() {
        let tmp = TempDir::new().unwrap();
        let adapter = adapter(&tmp);
        let schema = Schema::builder()
            .table("logs", [("line", schema::string())])
            .build();

        let state = DatabaseState::empty_for(&schema)
            .with_table("logs", TableState::with_records(vec![record! { "line" => "x" }], 0));
        let err = adapter.write(&state, &schema).unwrap_err();
        assert_eq!(err.code(), ErrorCode::MissingIdColumn);
        assert!(!adapter.table_dir("logs").exists());
    }

    #[test]
    fn test_write_changes_skips_shared_tables() {
        let tmp = TempDir::new().unwrap();
        let adapter = adapter(&tmp);
        let schema = schema();
        let before = seeded(&schema);
        adapter.write(&before, &schema).unwrap();
        fs::remove_file(adapter.table_dir("users").join("1.json")).unwrap();

        let (after, _) = insert(&before, &schema, "tokens", vec![record! { "value" => "t" }]).unwrap();
        adapter.write_changes(&before, &after, &schema).unwrap();

        assert!(!adapter.table_dir("users").join("1.json").exists());
        assert_eq!(adapter.read(&schema).unwrap().table("tokens").unwrap().len(), 1);
    }

    #[test]
    fn test_compare_ids() {
        let one = Value::number(1);
        let two = Value::number(2);
        let s = Value::string("a");
        assert_eq!(compare_ids(Some(&one), Some(&two)), Ordering::Less);
        assert_eq!(compare_ids(Some(&s), Some(&one)), Ordering::Greater);
        assert_eq!(compare_ids(None, None), Ordering::Equal);
    }
}
