//! In-memory document cache.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use vela_core::{ContentId, Document, Result};

use crate::cache::DocumentCache;

/// Document cache held in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryDocumentCache {
    rows: RwLock<HashMap<(ContentId, String), Document>>,
}

impl MemoryDocumentCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached documents across all aliases.
    pub fn len(&self) -> usize {
        self.rows.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentCache for MemoryDocumentCache {
    async fn get(&self, id: ContentId, alias: &str) -> Result<Option<Document>> {
        Ok(self
            .rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(id, alias.to_string()))
            .cloned())
    }

    async fn put(&self, alias: &str, document: &Document) -> Result<()> {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((document.document_key, alias.to_string()), document.clone());
        Ok(())
    }

    async fn delete(&self, id: ContentId, alias: &str) -> Result<()> {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(id, alias.to_string()));
        Ok(())
    }

    async fn clear(&self, alias: &str) -> Result<()> {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(_, a), _| a != alias);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
