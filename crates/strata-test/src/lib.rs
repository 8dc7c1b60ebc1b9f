//! # strata-test
//!
//! Integration tests for Strata.
//!
//! This crate contains:
//! - Shared fixtures (a blog schema, seed data, tracing setup)
//! - End-to-end tests driving the public API against real files

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Schemas, seed data and helpers shared by the integration tests
pub mod fixtures;
