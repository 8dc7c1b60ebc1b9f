//! # strata-common
//!
//! Common types, errors, and configuration for Strata.
//!
//! This crate provides the foundational types shared by every Strata
//! component:
//!
//! - **Types**: dynamically typed [`Value`]s, open-map [`Record`]s and
//!   microsecond [`Timestamp`]s
//! - **Errors**: unified error handling with [`StrataError`] and stable codes
//! - **Config**: storage adapter configuration
//! - **Constants**: file names and limits used by the storage layer
//!
//! ## Example
//!
//! ```rust
//! use strata_common::types::{Record, Value};
//! use strata_common::error::StrataResult;
//!
//! fn example() -> StrataResult<()> {
//!     let mut record = Record::new();
//!     record.insert("name".to_string(), Value::string("Alice"));
//!     record.insert("age".to_string(), Value::number(30));
//!     assert_eq!(record.get("age"), Some(&Value::Number(30.0)));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use error::{ErrorCode, StrataError, StrataResult};
pub use types::{Record, Timestamp, Value};
