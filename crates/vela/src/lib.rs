//! Vela search index synchronisation: umbrella crate.
//!
//! This crate re-exports all Vela components for convenience.
//! Use feature flags to enable specific backends:
//!
//! - `fts`: physical index stores, with the Tantivy backend
//! - `storage`: document caches, with the SQLite backend
//! - `full`: everything

pub use vela_acl as acl;
pub use vela_core as core;
pub use vela_indexing as indexing;

#[cfg(feature = "fts")]
pub use vela_fts as fts;

#[cfg(feature = "storage")]
pub use vela_storage as storage;

pub use vela_core::{Error, IndexingConfig, Result};
pub use vela_indexing::{IndexingOrchestrator, OrchestratorBuilder, RebuildOutcome};
