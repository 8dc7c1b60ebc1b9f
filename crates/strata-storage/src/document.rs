//! Conversion between JSON documents and engine snapshots.
//!
//! Document shapes:
//!
//! ```text
//! record:   { "id": 1, "name": "Ann", "created_at": "2024-01-01T00:00:00.000000Z" }
//! table:    { "records": [record, ...], "meta": { "lastId": 1 } }
//! database: { "<table>": table, ... }
//! ```
//!
//! Dates are written as RFC 3339 strings. Reading turns them back into
//! dates for the columns the table schema declares as `date`; a string that
//! does not parse is kept as a string.

use serde::{Deserialize, Serialize};
use tracing::warn;

use strata_common::error::{StrataError, StrataResult};
use strata_common::types::{Record, RecordExt, Timestamp, Value};
use strata_engine::schema::{Schema, TableSchema};
use strata_engine::state::{DatabaseState, TableMeta, TableState};

/// On-disk table metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaDocument {
    /// Auto-increment high-water mark.
    #[serde(default)]
    pub last_id: u64,
}

impl From<TableMeta> for MetaDocument {
    fn from(meta: TableMeta) -> Self {
        Self {
            last_id: meta.last_id,
        }
    }
}

impl From<MetaDocument> for TableMeta {
    fn from(doc: MetaDocument) -> Self {
        Self {
            last_id: doc.last_id,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TableDocument {
    #[serde(default)]
    records: Vec<serde_json::Value>,
    #[serde(default)]
    meta: MetaDocument,
}

/// Converts a record document, hydrating the date columns of `table`.
pub fn record_from_json(json: serde_json::Value, table: Option<&TableSchema>) -> StrataResult<Record> {
    let Value::Object(mut record) = Value::from_json(json) else {
        return Err(StrataError::Serialization {
            message: "expected a JSON object for a record".to_string(),
        });
    };

    if let Some(table) = table {
        for column in table.date_columns() {
            let parsed = record
                .get(column)
                .and_then(Value::as_str)
                .and_then(Timestamp::parse_rfc3339);
            if let Some(ts) = parsed {
                record.insert(column.to_string(), Value::Date(ts));
            }
        }
    }

    Ok(record)
}

/// Converts a record into a document.
pub fn record_to_json(record: &Record) -> serde_json::Value {
    record.to_json()
}

/// Converts a table metadata document.
pub fn meta_from_json(json: serde_json::Value) -> StrataResult<TableMeta> {
    let doc: MetaDocument = serde_json::from_value(json)?;
    Ok(doc.into())
}

/// Converts table metadata into a document.
pub fn meta_to_json(meta: TableMeta) -> serde_json::Value {
    serde_json::json!({ "lastId": meta.last_id })
}

/// Converts a table document.
pub fn table_from_json(json: serde_json::Value, table: Option<&TableSchema>) -> StrataResult<TableState> {
    let doc: TableDocument = serde_json::from_value(json)?;
    let records = doc
        .records
        .into_iter()
        .map(|r| record_from_json(r, table))
        .collect::<StrataResult<Vec<_>>>()?;
    Ok(TableState::with_records(records, doc.meta.last_id))
}

/// Converts a table into a document.
pub fn table_to_json(table: &TableState) -> serde_json::Value {
    serde_json::json!({
        "records": table.records.iter().map(record_to_json).collect::<Vec<_>>(),
        "meta": meta_to_json(table.meta),
    })
}

/// Converts a database document.
///
/// Every schema table is present in the result; tables missing from the
/// document are empty. Tables the schema does not know are dropped.
pub fn state_from_json(json: serde_json::Value, schema: &Schema) -> StrataResult<DatabaseState> {
    let serde_json::Value::Object(tables) = json else {
        return Err(StrataError::Serialization {
            message: "expected a JSON object for the database".to_string(),
        });
    };

    let mut state = DatabaseState::empty_for(schema);
    for (name, doc) in tables {
        let Some(table_schema) = schema.table(&name) else {
            warn!("Ignoring table {} absent from the schema", name);
            continue;
        };
        state = state.with_table(&name, table_from_json(doc, Some(table_schema))?);
    }
    Ok(state)
}

/// Converts a database into a document.
pub fn state_to_json(state: &DatabaseState) -> serde_json::Value {
    serde_json::Value::Object(
        state
            .tables()
            .map(|(name, table)| (name.to_string(), table_to_json(table)))
            .collect(),
    )
}
