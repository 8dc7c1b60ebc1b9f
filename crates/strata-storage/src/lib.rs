//! # strata-storage
//!
//! Persistence for Strata snapshots.
//!
//! This crate provides:
//! - `Serializer`: text codec between files and JSON documents
//! - `document`: conversion between documents and engine snapshots
//! - `StorageAdapter`: the read/write boundary used by the database context
//! - File adapters for three on-disk layouts, plus an in-memory adapter
//!
//! # Layouts
//!
//! ```text
//! single-file          multi-file             per-record
//! db.json              data/                  data/
//!  { users: {...},      ├── users.json         ├── users/
//!    posts: {...} }     └── posts.json         │   ├── _meta.json
//!                                              │   ├── 1.json
//!                                              │   └── 2.json
//!                                              └── posts/ ...
//! ```
//!
//! Every file is replaced atomically: written to a temporary sibling,
//! optionally flushed, then renamed over the target.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod document;
pub mod fs;
pub mod serializer;

pub use adapter::{
    create_file_adapter, MemoryAdapter, MultiFileAdapter, PerRecordAdapter, SingleFileAdapter,
    StorageAdapter,
};
pub use serializer::{serializer_for, JsonSerializer, Serializer, YamlSerializer};
