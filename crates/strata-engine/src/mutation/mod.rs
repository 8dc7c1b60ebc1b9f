//! Validated mutations.
//!
//! Every mutation takes a snapshot by reference and returns the next
//! snapshot together with the affected records. A failure anywhere,
//! including inside a cascade, returns the error and no state, so callers
//! keep the snapshot they started from.
//!
//! ```text
//!   delete(posts, id = 1)
//!     ├── soft/hard delete matching posts
//!     └── per deleted post
//!           ├── forward:  posts.comments (many, cascade)  ─► delete(comments, post_id = 1)
//!           └── reverse:  likes.post     (one, set null)  ─► update(likes, post_id := null)
//! ```

mod cascade;
mod delete;
mod insert;
mod update;

pub use delete::delete;
pub use insert::insert;
pub use update::update;

use strata_common::error::StrataResult;
use strata_common::types::Record;

use crate::state::DatabaseState;

/// Next snapshot plus the records a mutation touched, in table order.
pub type MutationResult = StrataResult<(DatabaseState, Vec<Record>)>;
