//! Document cache abstraction and backend factory.
//!
//! The cache keeps the last document written for each `(item, index alias)`
//! pair so a rebuild can skip field recomputation for unchanged items.

use std::sync::Arc;

use async_trait::async_trait;
use vela_core::{CacheConfig, ContentId, Document, Error, Result};

use crate::memory::MemoryDocumentCache;

/// Persisted copy of indexed documents, keyed by `(item id, index alias)`.
///
/// `put` replaces any previous row for the same key. A read followed by a
/// write is not atomic.
#[async_trait]
pub trait DocumentCache: Send + Sync {
    /// The cached document, if any.
    async fn get(&self, id: ContentId, alias: &str) -> Result<Option<Document>>;

    /// Store a document, replacing the previous one.
    async fn put(&self, alias: &str, document: &Document) -> Result<()>;

    /// Delete the cached document for one item.
    async fn delete(&self, id: ContentId, alias: &str) -> Result<()>;

    /// Delete every cached document of an alias.
    async fn clear(&self, alias: &str) -> Result<()>;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;
}

/// Create the document cache described by `config`.
///
/// Supported backends: `memory`, and `sqlite` when the `cache-sqlite`
/// feature is enabled. A SQLite cache without a path lives in memory.
pub async fn create_document_cache(config: &CacheConfig) -> Result<Arc<dyn DocumentCache>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryDocumentCache::new())),
        #[cfg(feature = "cache-sqlite")]
        "sqlite" => {
            let cache = match &config.path {
                Some(path) => crate::sqlite::SqliteDocumentCache::open(path).await?,
                None => crate::sqlite::SqliteDocumentCache::in_memory().await?,
            };
            Ok(Arc::new(cache))
        }
        other => Err(Error::config(format!(
            "unsupported document cache backend '{other}'"
        ))),
    }
}
