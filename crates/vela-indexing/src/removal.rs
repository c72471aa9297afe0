//! Deferred index removals.
//!
//! Removals accumulate while a change batch is processed and are flushed
//! before the next write, so a later refresh of the same id in the batch
//! cancels a pending removal instead of racing it.

use vela_core::{ContentId, ObjectType, Result};
use vela_storage::DocumentCache;

use crate::index_info::IndexInfo;

/// Ids waiting to be deleted from every index accepting their object type.
#[derive(Debug, Default)]
pub struct RemovalBatch {
    pending: Vec<(ContentId, ObjectType)>,
}

impl RemovalBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an id for removal; repeated ids are kept once.
    pub fn defer(&mut self, id: ContentId, object_type: ObjectType) {
        if !self.contains(id) {
            self.pending.push((id, object_type));
        }
    }

    /// Drop a pending removal. Returns whether one was pending.
    pub fn cancel(&mut self, id: ContentId) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(pending, _)| *pending != id);
        before != self.pending.len()
    }

    /// Whether `id` is pending removal.
    pub fn contains(&self, id: ContentId) -> bool {
        self.pending.iter().any(|(pending, _)| *pending == id)
    }

    /// Number of pending ids.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Delete every pending id from the indexes and the document cache.
    ///
    /// Descendants removed from an index by the cascade lose their cache
    /// rows too. Returns the number of ids flushed. The batch is empty
    /// afterwards even when a delete fails.
    pub async fn flush(
        &mut self,
        indexes: &[IndexInfo],
        cache: &dyn DocumentCache,
    ) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        let pending = std::mem::take(&mut self.pending);

        for index in indexes {
            let ids: Vec<ContentId> = pending
                .iter()
                .filter(|(_, object_type)| index.accepts(*object_type))
                .map(|(id, _)| *id)
                .collect();
            if ids.is_empty() {
                continue;
            }
            log::debug!("Removing {} documents from '{}'", ids.len(), index.alias);
            let mut removed = index.indexer.delete(&index.alias, &ids).await?;
            removed.extend(ids);
            removed.sort();
            removed.dedup();
            for id in removed {
                cache.delete(id, &index.alias).await?;
            }
        }
        Ok(pending.len())
    }
}
