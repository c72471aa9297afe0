//! Vela Core: shared content model, change events, documents, errors, and
//! configuration.
//!
//! This crate provides the foundational types used across all Vela crates.
//! It has no internal Vela dependencies.
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`content`]: Content items, object types, property values
//! - [`changes`]: Content change events
//! - [`document`]: Index fields, variations, protection, documents
//! - [`repository`]: Read access to the content tree
//! - [`config`]: TOML indexing configuration

pub mod changes;
pub mod config;
pub mod content;
pub mod document;
pub mod error;
pub mod repository;

// Re-export key types at crate root for convenience
pub use changes::{ChangeType, ContentChange, ContentState};
pub use config::{
    CacheConfig, DEFAULT_INDEXER, DRAFT_STRATEGY, IndexConfig, IndexingConfig, PUBLISHED_STRATEGY,
    QueueConfig, StoreConfig,
};
pub use content::{ContentId, ContentItem, ObjectType, PropertyValue};
pub use document::{
    ContentProtection, Document, FieldKey, FieldValue, IndexField, Variation, field_names,
};
pub use error::{Error, Result};
pub use repository::{
    ContentRepository, DESCENDANT_PAGE_SIZE, DescendantFilter, MemoryContentRepository,
};
