//! Delete.

use tracing::debug;

use strata_common::error::StrataError;
use strata_common::types::{RecordExt, Timestamp, Value};

use super::cascade::cascade;
use super::MutationResult;
use crate::filter::Filter;
use crate::schema::Schema;
use crate::state::{DatabaseState, TableState};

/// Deletes every record of `table` accepted by `filter`.
///
/// Tables with a `deleted_at` column are soft-deleted: the column is set to
/// now and the record stays. Records already soft-deleted are skipped even
/// when the filter accepts them. Other tables lose the records outright.
///
/// Relations with an `on_delete` action then cascade from every affected
/// record. When nothing is affected, the input state is returned as is and
/// no cascade runs.
pub fn delete(state: &DatabaseState, schema: &Schema, table: &str, filter: &Filter) -> MutationResult {
    let current = state
        .table(table)
        .ok_or_else(|| StrataError::table_not_found(table))?;
    let deleted_at = schema.table(table).and_then(|t| t.deleted_at_column());

    let now = Timestamp::now();
    let mut records = Vec::with_capacity(current.records.len());
    let mut affected = Vec::new();

    for record in &current.records {
        let eligible =
            filter.test(record) && deleted_at.map_or(true, |c| record.is_null_or_unset(c));
        if !eligible {
            records.push(record.clone());
            continue;
        }

        match deleted_at {
            Some(column) => {
                let mut soft = record.clone();
                soft.insert(column.to_string(), Value::Date(now));
                records.push(soft.clone());
                affected.push(soft);
            }
            None => affected.push(record.clone()),
        }
    }

    if affected.is_empty() {
        return Ok((state.clone(), affected));
    }

    debug!(
        "{} {} record(s) in {}",
        if deleted_at.is_some() { "Soft-deleted" } else { "Deleted" },
        affected.len(),
        table
    );

    let mut next = state.with_table(
        table,
        TableState {
            records,
            meta: current.meta,
        },
    );
    for parent in &affected {
        next = cascade(next, schema, table, parent)?;
    }

    Ok((next, affected))
}
