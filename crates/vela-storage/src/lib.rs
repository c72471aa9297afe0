//! # vela-storage
//!
//! Persisted document cache for the Vela indexing pipeline.
//!
//! - [`MemoryDocumentCache`]: process-local map, used in tests
//! - `SqliteDocumentCache`: SQLite table (feature `cache-sqlite`)
//!
//! Use [`create_document_cache`] to build the backend named in
//! [`vela_core::CacheConfig`].

pub mod cache;
pub mod memory;
#[cfg(feature = "cache-sqlite")]
pub mod sqlite;

pub use cache::{DocumentCache, create_document_cache};
pub use memory::MemoryDocumentCache;
#[cfg(feature = "cache-sqlite")]
pub use sqlite::SqliteDocumentCache;
