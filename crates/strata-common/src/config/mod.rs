//! Configuration for Strata.
//!
//! This module provides configuration structures for the storage adapters.

mod adapter;

pub use adapter::{AdapterConfig, AdapterMode, Format, Strategy};
