//! Insert.

use tracing::debug;
use uuid::Uuid;

use strata_common::error::StrataError;
use strata_common::types::{Record, Timestamp, Value};

use super::MutationResult;
use crate::schema::{ManagedTimestamp, PkStrategy, Schema, TableSchema};
use crate::state::{DatabaseState, TableState};
use crate::validation::validate;

/// Inserts `values` into `table`, in order.
///
/// Each record gets engine-assigned ids, then defaults for unset columns,
/// then is validated against the table's records (earlier members of the
/// same batch included) and appended. One invalid record fails the whole
/// batch. Only `table` is copied in the returned state.
pub fn insert(
    state: &DatabaseState,
    schema: &Schema,
    table: &str,
    values: Vec<Record>,
) -> MutationResult {
    let current = state
        .table(table)
        .ok_or_else(|| StrataError::table_not_found(table))?;
    let table_schema = schema
        .table(table)
        .ok_or_else(|| StrataError::schema_not_found(table))?;

    let mut working = current.clone();
    let mut inserted = Vec::with_capacity(values.len());

    for value in values {
        let record = prepare(value, table_schema, &mut working);
        validate(&record, table_schema, working.records.iter())?;
        working.records.push(record.clone());
        inserted.push(record);
    }

    debug!(
        "Inserted {} record(s) into {} (last_id {})",
        inserted.len(),
        table,
        working.meta.last_id
    );

    Ok((state.with_table(table, working), inserted))
}

/// Applies ids and defaults to one incoming record.
fn prepare(mut record: Record, table_schema: &TableSchema, working: &mut TableState) -> Record {
    let now = Timestamp::now();

    for (column, def) in table_schema.columns() {
        match def.pk_strategy() {
            Some(PkStrategy::AutoIncrement) => {
                working.meta.last_id += 1;
                record.insert(column.to_string(), Value::from(working.meta.last_id));
                continue;
            }
            Some(PkStrategy::Uuid) => {
                record.insert(column.to_string(), Value::String(Uuid::new_v4().to_string()));
                continue;
            }
            None => {}
        }

        if record.contains_key(column) {
            continue;
        }
        let value = match (def.managed(), &def.options.default) {
            (Some(ManagedTimestamp::CreatedAt | ManagedTimestamp::UpdatedAt), _) => {
                Some(Value::Date(now))
            }
            (_, Some(default)) => Some(default.produce()),
            (_, None) => None,
        };
        if let Some(value) = value {
            record.insert(column.to_string(), value);
        }
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{
        created_at, deleted_at, id, number, string, updated_at, uuid as uuid_column,
    };
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use strata_common::{record, ErrorCode};

    fn schema() -> Schema {
        Schema::builder()
            .table(
                "users",
                [
                    ("id", id()),
                    ("email", string().unique()),
                    ("role", string().with_default("member")),
                    ("created_at", created_at()),
                    ("updated_at", updated_at()),
                    ("deleted_at", deleted_at()),
                ],
            )
            .table("tokens", [("id", uuid_column()), ("value", string())])
            .build()
    }

    #[test]
    fn test_auto_increment_ids() {
        let schema = schema();
        let state = DatabaseState::empty_for(&schema);
        let values = (0..5)
            .map(|i| record! { "email" => format!("u{i}@x.com") })
            .collect();
        let (next, inserted) = insert(&state, &schema, "users", values).unwrap();

        let ids: Vec<_> = inserted.iter().map(|r| r.get("id").cloned().unwrap()).collect();
        assert_eq!(ids, (1..=5).map(Value::from).collect::<Vec<_>>());
        assert_eq!(next.table("users").unwrap().meta.last_id, 5);
        assert_eq!(next.table("users").unwrap().records, inserted);
    }

    #[test]
    fn test_caller_supplied_id_is_replaced() {
        let schema = schema();
        let state = DatabaseState::empty_for(&schema);
        let (_, inserted) =
            insert(&state, &schema, "users", vec![record! { "id" => 99 }]).unwrap();
        assert_eq!(inserted[0].get("id"), Some(&Value::number(1)));
    }

    #[test]
    fn test_uuid_ids_leave_last_id() {
        let schema = schema();
        let state = DatabaseState::empty_for(&schema);
        let (next, inserted) = insert(
            &state,
            &schema,
            "tokens",
            vec![record! { "value" => "a" }, record! { "value" => "b" }],
        )
        .unwrap();
        let a = inserted[0].get("id").and_then(Value::as_str).unwrap();
        let b = inserted[1].get("id").and_then(Value::as_str).unwrap();
        assert_eq!(a.len(), 36);
        assert_ne!(a, b);
        assert!(Uuid::parse_str(a).is_ok());
        assert_eq!(next.table("tokens").unwrap().meta.last_id, 0);
    }

    #[test]
    fn test_defaults_and_managed_columns() {
        let schema = schema();
        let state = DatabaseState::empty_for(&schema);
        let (_, inserted) = insert(
            &state,
            &schema,
            "users",
            vec![
                record! { "email" => "a@x.com" },
                record! { "email" => "b@x.com", "role" => "admin" },
            ],
        )
        .unwrap();

        let a = &inserted[0];
        assert_eq!(a.get("role"), Some(&Value::string("member")));
        assert_eq!(a.get("deleted_at"), Some(&Value::Null));
        assert!(a.get("created_at").and_then(Value::as_timestamp).is_some());
        assert_eq!(a.get("created_at"), a.get("updated_at"));
        assert_eq!(inserted[1].get("role"), Some(&Value::string("admin")));
    }

    #[test]
    fn test_explicit_null_is_not_unset() {
        let schema = schema();
        let state = DatabaseState::empty_for(&schema);
        let (_, inserted) = insert(
            &state,
            &schema,
            "users",
            vec![record! { "email" => "a@x.com", "role" => Value::Null }],
        )
        .unwrap();
        assert_eq!(inserted[0].get("role"), Some(&Value::Null));
    }

    #[test]
    fn test_factory_default_per_record() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&counter);
        let schema = Schema::builder()
            .table(
                "t",
                [
                    ("id", id()),
                    (
                        "seq",
                        number().with_default_fn(move || {
                            Value::from(c.fetch_add(1, Ordering::SeqCst) as i32)
                        }),
                    ),
                ],
            )
            .build();
        let state = DatabaseState::empty_for(&schema);
        let (_, inserted) =
            insert(&state, &schema, "t", vec![record! {}, record! {}, record! {}]).unwrap();
        let seqs: Vec<_> = inserted.iter().map(|r| r.get("seq").cloned().unwrap()).collect();
        assert_eq!(seqs, vec![Value::number(0), Value::number(1), Value::number(2)]);
    }

    #[test]
    fn test_batch_duplicate_is_all_or_nothing() {
        let schema = schema();
        let state = DatabaseState::empty_for(&schema);
        let err = insert(
            &state,
            &schema,
            "users",
            vec![record! { "email" => "a@x.com" }, record! { "email" => "a@x.com" }],
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UniqueViolation);
        assert!(state.table("users").unwrap().is_empty());
        assert_eq!(state.table("users").unwrap().meta.last_id, 0);
    }

    #[test]
    fn test_untouched_tables_shared() {
        let schema = schema();
        let state = DatabaseState::empty_for(&schema);
        let (next, _) = insert(&state, &schema, "users", vec![record! {}]).unwrap();
        assert!(next.shares_table(&state, "tokens"));
        assert!(!next.shares_table(&state, "users"));
        assert!(state.table("users").unwrap().is_empty());
    }

    #[test]
    fn test_missing_table_and_schema() {
        let schema = schema();
        let err = insert(&DatabaseState::new(), &schema, "users", vec![]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::TableNotFound);

        let state = DatabaseState::from_tables([("ghost".to_string(), TableState::new())]);
        let err = insert(&state, &schema, "ghost", vec![]).unwrap_err();
        assert_eq!(err.code(), ErrorCode::SchemaNotFound);
    }
}
