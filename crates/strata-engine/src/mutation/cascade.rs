//! Referential actions run after a record is deleted.

use tracing::debug;

use strata_common::error::StrataResult;
use strata_common::types::{Record, Value};

use super::{delete, update};
use crate::filter::Filter;
use crate::schema::{OnDelete, Schema};
use crate::state::DatabaseState;

/// Applies every `on_delete` action triggered by `parent` leaving `table`.
///
/// Forward: `Many` relations declared on `table` with `Cascade` delete the
/// target records whose `[references]` equals `parent[on]`.
///
/// Reverse: `One` relations declared on any other table and targeting
/// `table` either null out (`SetNull`, through [`update`]) or delete
/// (`Cascade`) the owning records whose `[on]` equals `parent[references]`.
///
/// Relations without an action, whose key the parent lacks, or whose
/// affected table is absent from the state are skipped. Cascaded deletes
/// run their own cascades.
pub(super) fn cascade(
    mut state: DatabaseState,
    schema: &Schema,
    table: &str,
    parent: &Record,
) -> StrataResult<DatabaseState> {
    if let Some(relations) = schema.relations(table) {
        for (name, relation) in relations {
            if relation.is_one() || relation.on_delete() != Some(OnDelete::Cascade) {
                continue;
            }
            let Some(key) = parent.get(relation.on()) else {
                continue;
            };
            let target = relation.target_table();
            if !state.contains_table(target) {
                continue;
            }

            debug!("Cascading delete {}.{} -> {}", table, name, target);
            let children = matching(relation.references(), key);
            state = delete(&state, schema, target, &children)?.0;
        }
    }

    for (owner, relation) in schema.referencing(table) {
        let Some(action) = relation.on_delete() else {
            continue;
        };
        let Some(key) = parent.get(relation.references()) else {
            continue;
        };
        if !state.contains_table(owner) {
            continue;
        }

        let dependents = matching(relation.on(), key);
        state = match action {
            OnDelete::SetNull => {
                debug!("Nulling {}.{} after delete in {}", owner, relation.on(), table);
                let mut patch = Record::new();
                patch.insert(relation.on().to_string(), Value::Null);
                update(&state, schema, owner, &patch, &dependents)?.0
            }
            OnDelete::Cascade => {
                debug!("Cascading delete {} -> {}", table, owner);
                delete(&state, schema, owner, &dependents)?.0
            }
        };
    }

    Ok(state)
}

fn matching(column: &str, key: &Value) -> Filter {
    let mut partial = Record::new();
    partial.insert(column.to_string(), key.clone());
    Filter::matching(partial)
}

#[cfg(test)]
mod tests {
    use crate::filter::Filter;
    use crate::mutation::{delete, insert};
    use crate::schema::{deleted_at, id, many, number, one, string, OnDelete, Schema};
    use crate::state::DatabaseState;
    use strata_common::{record, ErrorCode, Value};

    fn blog(author_action: Option<OnDelete>) -> Schema {
        let author = one("users", "author_id", "id");
        let author = match author_action {
            Some(action) => author.with_on_delete(action),
            None => author,
        };
        Schema::builder()
            .table("users", [("id", id()), ("name", string())])
            .table(
                "posts",
                [
                    ("id", id()),
                    ("author_id", number()),
                    ("title", string()),
                ],
            )
            .table(
                "comments",
                [("id", id()), ("post_id", number()), ("body", string())],
            )
            .relation("users", "posts", many("posts", "id", "author_id"))
            .relation("posts", "author", author)
            .relation(
                "posts",
                "comments",
                many("comments", "id", "post_id").with_on_delete(OnDelete::Cascade),
            )
            .build()
    }

    fn seed(schema: &Schema) -> DatabaseState {
        let state = DatabaseState::empty_for(schema);
        let (state, _) = insert(
            &state,
            schema,
            "users",
            vec![record! { "name" => "Ann" }, record! { "name" => "Ben" }],
        )
        .unwrap();
        let (state, _) = insert(
            &state,
            schema,
            "posts",
            vec![
                record! { "author_id" => 1, "title" => "p1" },
                record! { "author_id" => 2, "title" => "p2" },
                record! { "author_id" => 1, "title" => "p3" },
            ],
        )
        .unwrap();
        let (state, _) = insert(
            &state,
            schema,
            "comments",
            vec![
                record! { "post_id" => 1, "body" => "c1" },
                record! { "post_id" => 2, "body" => "c2" },
                record! { "post_id" => 1, "body" => "c3" },
                record! { "post_id" => 3, "body" => "c4" },
            ],
        )
        .unwrap();
        state
    }

    fn column(state: &DatabaseState, table: &str, column: &str) -> Vec<Value> {
        state
            .table(table)
            .unwrap()
            .records
            .iter()
            .map(|r| r.get(column).cloned().unwrap_or(Value::Null))
            .collect()
    }

    #[test]
    fn test_forward_cascade_removes_children() {
        let schema = blog(None);
        let state = seed(&schema);
        let (next, _) = delete(
            &state,
            &schema,
            "posts",
            &Filter::matching(record! { "id" => 1 }),
        )
        .unwrap();
        assert_eq!(
            column(&next, "comments", "body"),
            vec![Value::string("c2"), Value::string("c4")]
        );
        assert!(next.shares_table(&state, "users"));
    }

    #[test]
    fn test_set_null_on_referencing_records() {
        let schema = Schema::builder()
            .table("users", [("id", id())])
            .table("posts", [("id", id()), ("author_id", number())])
            .relation(
                "posts",
                "author",
                one("users", "author_id", "id").with_on_delete(OnDelete::SetNull),
            )
            .build();
        let state = DatabaseState::empty_for(&schema);
        let (state, _) = insert(&state, &schema, "users", vec![record! {}, record! {}]).unwrap();
        let (state, _) = insert(
            &state,
            &schema,
            "posts",
            vec![
                record! { "author_id" => 1 },
                record! { "author_id" => 2 },
                record! { "author_id" => 1 },
            ],
        )
        .unwrap();

        let (next, _) = delete(
            &state,
            &schema,
            "users",
            &Filter::matching(record! { "id" => 1 }),
        )
        .unwrap();
        assert_eq!(
            column(&next, "posts", "author_id"),
            vec![Value::Null, Value::number(2), Value::Null]
        );
    }

    #[test]
    fn test_reverse_cascade_composes() {
        let schema = blog(Some(OnDelete::Cascade));
        let state = seed(&schema);
        let (next, _) = delete(
            &state,
            &schema,
            "users",
            &Filter::matching(record! { "id" => 1 }),
        )
        .unwrap();
        // Ann's posts go, and with them their comments.
        assert_eq!(column(&next, "posts", "title"), vec![Value::string("p2")]);
        assert_eq!(column(&next, "comments", "body"), vec![Value::string("c2")]);
    }

    #[test]
    fn test_relations_without_action_are_inert() {
        let schema = blog(None);
        let state = seed(&schema);
        let (next, _) = delete(
            &state,
            &schema,
            "users",
            &Filter::matching(record! { "id" => 1 }),
        )
        .unwrap();
        assert!(next.shares_table(&state, "posts"));
        assert!(next.shares_table(&state, "comments"));
    }

    #[test]
    fn test_set_null_failure_aborts_delete() {
        // Nulling profile 2 collides with profile 1's null on a unique column.
        let schema = Schema::builder()
            .table("users", [("id", id())])
            .table(
                "profiles",
                [("id", id()), ("user_id", number().unique())],
            )
            .relation(
                "profiles",
                "user",
                one("users", "user_id", "id").with_on_delete(OnDelete::SetNull),
            )
            .build();
        let state = DatabaseState::empty_for(&schema);
        let (state, _) = insert(&state, &schema, "users", vec![record! {}, record! {}]).unwrap();
        let (state, _) = insert(
            &state,
            &schema,
            "profiles",
            vec![record! { "user_id" => Value::Null }, record! { "user_id" => 2 }],
        )
        .unwrap();

        let err = delete(
            &state,
            &schema,
            "users",
            &Filter::matching(record! { "id" => 2 }),
        )
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UniqueViolation);
        assert_eq!(state.table("users").unwrap().len(), 2);
    }

    #[test]
    fn test_cascade_soft_deletes_children() {
        let schema = Schema::builder()
            .table("posts", [("id", id())])
            .table(
                "comments",
                [("id", id()), ("post_id", number()), ("deleted_at", deleted_at())],
            )
            .relation(
                "posts",
                "comments",
                many("comments", "id", "post_id").with_on_delete(OnDelete::Cascade),
            )
            .build();
        let state = DatabaseState::empty_for(&schema);
        let (state, _) = insert(&state, &schema, "posts", vec![record! {}]).unwrap();
        let (state, _) = insert(
            &state,
            &schema,
            "comments",
            vec![record! { "post_id" => 1 }, record! { "post_id" => 1 }],
        )
        .unwrap();

        let (next, _) = delete(&state, &schema, "posts", &Filter::all()).unwrap();
        let comments = next.table("comments").unwrap();
        assert_eq!(comments.len(), 2);
        assert!(comments
            .records
            .iter()
            .all(|c| c.get("deleted_at").and_then(Value::as_timestamp).is_some()));
    }

    #[test]
    fn test_self_referencing_cascade_terminates() {
        let schema = Schema::builder()
            .table("nodes", [("id", id()), ("parent_id", number())])
            .relation(
                "nodes",
                "children",
                many("nodes", "id", "parent_id").with_on_delete(OnDelete::Cascade),
            )
            .build();
        let state = DatabaseState::empty_for(&schema);
        let (state, _) = insert(
            &state,
            &schema,
            "nodes",
            vec![
                record! { "parent_id" => Value::Null },
                record! { "parent_id" => 1 },
                record! { "parent_id" => 2 },
                record! { "parent_id" => Value::Null },
            ],
        )
        .unwrap();

        let (next, removed) = delete(
            &state,
            &schema,
            "nodes",
            &Filter::matching(record! { "id" => 1 }),
        )
        .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(column(&next, "nodes", "id"), vec![Value::number(4)]);
    }
}
