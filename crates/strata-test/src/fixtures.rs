use std::sync::Once;

use strata::schema::{
    created_at, deleted_at, id, many, number, one, string, updated_at, OnDelete, StringFormat,
};
use strata::{record, Database, DatabaseState, Record, Schema, Value};

static TRACING: Once = Once::new();

/// Installs a test subscriber once per process. Honors `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A blog: users, their posts, comments on posts and one profile per user.
///
/// - `users.posts`: many, no action
/// - `posts.author`: one, SET NULL when the user goes
/// - `posts.comments`: many, CASCADE
/// - `profiles.user`: one, CASCADE when the user goes
/// - `comments` are soft-deleted
pub fn blog_schema() -> Schema {
    Schema::builder()
        .table(
            "users",
            [
                ("id", id()),
                ("name", string().with_min(2.0).with_max(40.0)),
                ("email", string().unique().with_format(StringFormat::Email)),
                ("age", number().with_min(0.0).with_max(150.0).optional()),
                ("created_at", created_at()),
                ("updated_at", updated_at()),
            ],
        )
        .table(
            "posts",
            [
                ("id", id()),
                ("title", string().with_min(1.0)),
                ("author_id", number().optional()),
                ("views", number().with_default(0)),
            ],
        )
        .table(
            "comments",
            [
                ("id", id()),
                ("post_id", number()),
                ("body", string()),
                ("deleted_at", deleted_at()),
            ],
        )
        .table("profiles", [("id", id()), ("user_id", number()), ("bio", string())])
        .relation("users", "posts", many("posts", "id", "author_id"))
        .relation("users", "profile", one("profiles", "id", "user_id"))
        .relation(
            "posts",
            "author",
            one("users", "author_id", "id").with_on_delete(OnDelete::SetNull),
        )
        .relation(
            "posts",
            "comments",
            many("comments", "id", "post_id").with_on_delete(OnDelete::Cascade),
        )
        .relation(
            "profiles",
            "user",
            one("users", "user_id", "id").with_on_delete(OnDelete::Cascade),
        )
        .build()
}

/// Two users, three posts (two by Ann), four comments and one profile.
pub fn seed(db: &Database, state: &DatabaseState) -> DatabaseState {
    let (state, _) = db
        .insert(
            state,
            "users",
            vec![
                record! { "name" => "Ann", "email" => "ann@example.com", "age" => 31 },
                record! { "name" => "Ben", "email" => "ben@example.com" },
            ],
        )
        .expect("seed users failed");
    let (state, _) = db
        .insert(
            &state,
            "posts",
            vec![
                record! { "title" => "Hello", "author_id" => 1, "views" => 10 },
                record! { "title" => "Second", "author_id" => 2, "views" => 3 },
                record! { "title" => "Again", "author_id" => 1 },
            ],
        )
        .expect("seed posts failed");
    let (state, _) = db
        .insert(
            &state,
            "comments",
            vec![
                record! { "post_id" => 1, "body" => "first!" },
                record! { "post_id" => 2, "body" => "nice" },
                record! { "post_id" => 1, "body" => "agreed" },
                record! { "post_id" => 3, "body" => "hmm" },
            ],
        )
        .expect("seed comments failed");
    let (state, _) = db
        .insert(&state, "profiles", vec![record! { "user_id" => 1, "bio" => "writer" }])
        .expect("seed profiles failed");
    state
}

/// Values of `column` across `rows`, unset columns as null.
pub fn column(rows: &[Record], column: &str) -> Vec<Value> {
    rows.iter()
        .map(|r| r.get(column).cloned().unwrap_or(Value::Null))
        .collect()
}

/// Records of `table` in storage order.
pub fn records(state: &DatabaseState, table: &str) -> Vec<Record> {
    state
        .table(table)
        .map(|t| t.records.clone())
        .unwrap_or_default()
}
