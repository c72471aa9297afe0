//! Paged traversal of a subtree.

use std::sync::Arc;

use vela_core::{
    ContentId, ContentItem, ContentRepository, DESCENDANT_PAGE_SIZE, DescendantFilter, Result,
};

/// Walks the descendants of one root, one repository page at a time.
pub struct DescendantPages {
    repository: Arc<dyn ContentRepository>,
    root_id: ContentId,
    page: usize,
    page_size: usize,
    filter: DescendantFilter,
    done: bool,
}

impl DescendantPages {
    /// Start a walk below `root_id` with the default page size.
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        root_id: ContentId,
        filter: DescendantFilter,
    ) -> Self {
        Self {
            repository,
            root_id,
            page: 0,
            page_size: DESCENDANT_PAGE_SIZE,
            filter,
            done: false,
        }
    }

    /// Override the page size (minimum 1).
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Next page, or `None` once the subtree is exhausted.
    pub async fn next_page(&mut self) -> Result<Option<Vec<ContentItem>>> {
        if self.done {
            return Ok(None);
        }
        let items = self
            .repository
            .get_paged_descendants(self.root_id, self.page, self.page_size, self.filter)
            .await?;
        self.page += 1;
        if items.len() < self.page_size {
            self.done = true;
        }
        if items.is_empty() {
            return Ok(None);
        }
        Ok(Some(items))
    }
}
