//! Physical index storage and slot management for Vela.
//!
//! This crate turns logical index aliases into physical indexes:
//!
//! - [`IndexStore`]: physical index backends (in-memory, Tantivy)
//! - [`ActiveIndexManager`]: active/shadow slot per alias
//! - [`SlottedIndexer`]: an [`Indexer`] writing into the current write slot
//!
//! # Features
//!
//! - `fts-tantivy` (default): Tantivy-backed store with an English stemming
//!   tokenizer

pub mod indexer;
pub mod memory;
pub mod slots;
pub mod store;

#[cfg(feature = "fts-tantivy")]
pub mod schema;
#[cfg(feature = "fts-tantivy")]
pub mod tantivy_store;

pub use indexer::{HealthStatus, Indexer, SlottedIndexer};
pub use memory::MemoryIndexStore;
pub use slots::{ActiveIndexManager, Slot, SlotState};
pub use store::{IndexStore, create_index_store};

#[cfg(feature = "fts-tantivy")]
pub use schema::DocumentSchema;
#[cfg(feature = "fts-tantivy")]
pub use tantivy_store::TantivyIndexStore;
