//! Type definitions for Strata.
//!
//! This module contains the dynamically typed values and records stored in
//! tables, and the timestamp type used for managed columns.

mod record;
mod timestamps;
mod value;

pub use record::{Record, RecordExt};
pub use timestamps::Timestamp;
pub use value::Value;
