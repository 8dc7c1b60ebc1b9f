//! Update.

use tracing::debug;

use strata_common::error::StrataError;
use strata_common::types::{Record, RecordExt, Timestamp, Value};

use super::MutationResult;
use crate::filter::Filter;
use crate::schema::{ManagedTimestamp, Schema};
use crate::state::{DatabaseState, TableState};
use crate::validation::validate;

/// Merges `data` into every record of `table` accepted by `filter`.
///
/// Id columns in `data` are ignored. `updated_at` columns are refreshed.
/// Each changed record is validated against every other record of the
/// table as it was before the call; records changed by the same call are
/// not checked against each other's new values. When nothing matches, the
/// input state is returned as is.
pub fn update(
    state: &DatabaseState,
    schema: &Schema,
    table: &str,
    data: &Record,
    filter: &Filter,
) -> MutationResult {
    let current = state
        .table(table)
        .ok_or_else(|| StrataError::table_not_found(table))?;
    let table_schema = schema
        .table(table)
        .ok_or_else(|| StrataError::schema_not_found(table))?;

    let mut patch = data.clone();
    for column in table_schema.id_columns() {
        patch.remove(column);
    }

    let now = Timestamp::now();
    let mut records = Vec::with_capacity(current.records.len());
    let mut updated = Vec::new();

    for (index, record) in current.records.iter().enumerate() {
        if !filter.test(record) {
            records.push(record.clone());
            continue;
        }

        let mut next = record.merged(&patch);
        for column in table_schema.managed_columns(ManagedTimestamp::UpdatedAt) {
            next.insert(column.to_string(), Value::Date(now));
        }

        let others = current
            .records
            .iter()
            .enumerate()
            .filter(move |(other, _)| *other != index)
            .map(|(_, r)| r);
        validate(&next, table_schema, others)?;

        records.push(next.clone());
        updated.push(next);
    }

    if updated.is_empty() {
        return Ok((state.clone(), updated));
    }

    debug!("Updated {} record(s) in {}", updated.len(), table);

    let next_table = TableState {
        records,
        meta: current.meta,
    };
    Ok((state.with_table(table, next_table), updated))
}
