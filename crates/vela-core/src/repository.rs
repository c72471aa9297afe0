//! Content repository boundary.
//!
//! The repository's storage and versioning engine is an external
//! collaborator; the pipeline only reads through [`ContentRepository`].
//! [`MemoryContentRepository`] is an in-process implementation used by tests
//! and by hosts that keep a content snapshot in memory.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::content::{ContentId, ContentItem, ObjectType};
use crate::error::Result;

/// Page size used when enumerating descendants.
pub const DESCENDANT_PAGE_SIZE: usize = 1000;

/// Filter applied when enumerating descendants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DescendantFilter {
    /// Include items in the recycle bin.
    pub include_trashed: bool,
}

/// Read access to the content tree.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Fetch one item. `Ok(None)` when the item no longer exists.
    async fn get_by_id(&self, id: ContentId) -> Result<Option<ContentItem>>;

    /// Root items of one object type, ordered by sort order.
    async fn get_root_items(&self, object_type: ObjectType) -> Result<Vec<ContentItem>>;

    /// One page of the descendants of `root_id` (excluding the root).
    ///
    /// Results are in path order: every item appears after all of its
    /// ancestors. A page shorter than `page_size` is the last one.
    async fn get_paged_descendants(
        &self,
        root_id: ContentId,
        page: usize,
        page_size: usize,
        filter: DescendantFilter,
    ) -> Result<Vec<ContentItem>>;
}

/// In-memory content repository.
#[derive(Debug, Default)]
pub struct MemoryContentRepository {
    items: RwLock<BTreeMap<ContentId, ContentItem>>,
}

impl MemoryContentRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an item.
    pub fn upsert(&self, item: ContentItem) {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(item.id, item);
    }

    /// Remove an item (descendants are left in place).
    pub fn remove(&self, id: ContentId) -> Option<ContentItem> {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
    }

    /// Apply a mutation to a stored item. Returns `false` if it is missing.
    pub fn update<F: FnOnce(&mut ContentItem)>(&self, id: ContentId, mutate: F) -> bool {
        let mut items = self.items.write().unwrap_or_else(PoisonError::into_inner);
        match items.get_mut(&id) {
            Some(item) => {
                mutate(item);
                true
            }
            None => false,
        }
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the repository is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn get_by_id(&self, id: ContentId) -> Result<Option<ContentItem>> {
        Ok(self
            .items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned())
    }

    async fn get_root_items(&self, object_type: ObjectType) -> Result<Vec<ContentItem>> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        let mut roots: Vec<ContentItem> = items
            .values()
            .filter(|item| item.object_type == object_type && item.parent_id().is_none())
            .cloned()
            .collect();
        roots.sort_by_key(|item| (item.sort_order, item.id));
        Ok(roots)
    }

    async fn get_paged_descendants(
        &self,
        root_id: ContentId,
        page: usize,
        page_size: usize,
        filter: DescendantFilter,
    ) -> Result<Vec<ContentItem>> {
        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        let mut descendants: Vec<&ContentItem> = items
            .values()
            .filter(|item| item.ancestor_ids().contains(&root_id))
            .filter(|item| filter.include_trashed || !item.trashed)
            .collect();
        descendants.sort_by_key(|item| (item.level(), item.sort_order, item.id));

        Ok(descendants
            .into_iter()
            .skip(page.saturating_mul(page_size))
            .take(page_size)
            .cloned()
            .collect())
    }
}

// ============================================================================
// Tests
// ============================================================================
