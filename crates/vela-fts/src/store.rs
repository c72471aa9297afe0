//! Physical index store abstraction and backend factory.
//!
//! A store holds any number of physical indexes addressed by name. The slot
//! manager decides which physical name backs a logical alias at any time.

use std::sync::Arc;

use vela_core::{ContentId, Document, Error, Result, StoreConfig};

use crate::memory::MemoryIndexStore;

/// Storage for physical indexes.
pub trait IndexStore: Send + Sync {
    /// Insert or replace a document in a physical index, creating the index
    /// on first use.
    fn upsert(&self, physical: &str, document: &Document) -> Result<()>;

    /// Delete documents by key, together with every document whose path
    /// contains one of the keys. Returns the keys of the removed documents.
    fn delete(&self, physical: &str, ids: &[ContentId]) -> Result<Vec<ContentId>>;

    /// Remove all documents, creating the index if it does not exist.
    fn reset(&self, physical: &str) -> Result<()>;

    /// Number of live documents; zero for an index that does not exist.
    fn document_count(&self, physical: &str) -> Result<u64>;

    /// Make staged writes durable and visible to readers.
    fn commit(&self, _physical: &str) -> Result<()> {
        Ok(())
    }

    /// Whether the physical index exists.
    fn contains(&self, physical: &str) -> bool;

    /// Backend name for diagnostics.
    fn name(&self) -> &str;
}

/// Create the index store described by `config`.
///
/// Supported backends: `memory`, and `tantivy` when the `fts-tantivy`
/// feature is enabled. A Tantivy store without a path keeps its indexes in
/// RAM.
pub fn create_index_store(config: &StoreConfig) -> Result<Arc<dyn IndexStore>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryIndexStore::new())),
        #[cfg(feature = "fts-tantivy")]
        "tantivy" => {
            let store = match &config.path {
                Some(path) => crate::tantivy_store::TantivyIndexStore::open(path)?,
                None => crate::tantivy_store::TantivyIndexStore::in_memory(),
            };
            Ok(Arc::new(store))
        }
        other => Err(Error::config(format!(
            "unsupported index store backend '{other}'"
        ))),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_memory() {
        let store = create_index_store(&StoreConfig::default()).unwrap();
        assert_eq!(store.name(), "memory");
    }

    #[test]
    fn test_factory_unknown_backend() {
        let config = StoreConfig {
            backend: "elastic".to_string(),
            path: None,
        };
        assert!(create_index_store(&config).err().unwrap().is_configuration());
    }

    #[cfg(feature = "fts-tantivy")]
    #[test]
    fn test_factory_tantivy() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig {
            backend: "tantivy".to_string(),
            path: Some(dir.path().display().to_string()),
        };
        let store = create_index_store(&config).unwrap();
        assert_eq!(store.name(), "tantivy");
    }
}
