//! Draft change strategy.

use vela_core::{ContentChange, ContentItem, DescendantFilter, Document, Result};

use super::{CancellationFlag, ChangeStats, IndexingContext, RebuildStats};
use crate::descendants::DescendantPages;
use crate::index_info::IndexInfo;
use crate::removal::RemovalBatch;
use crate::variations::draft_variations;

const DRAFT_FILTER: DescendantFilter = DescendantFilter {
    include_trashed: true,
};

/// Indexes the editable version of every item, published or not.
///
/// Changes that only flip publish state leave the draft untouched and are
/// ignored.
#[derive(Debug, Clone)]
pub struct DraftStrategy {
    context: IndexingContext,
}

impl DraftStrategy {
    /// Create the strategy.
    pub fn new(context: IndexingContext) -> Self {
        Self { context }
    }

    /// Apply a change batch.
    pub async fn handle(
        &self,
        indexes: &[IndexInfo],
        changes: &[ContentChange],
    ) -> Result<ChangeStats> {
        let mut stats = ChangeStats::default();
        let mut removals = RemovalBatch::new();

        for change in changes.iter().filter(|c| !c.publish_state_affected) {
            if !indexes.iter().any(|index| index.accepts(change.object_type)) {
                continue;
            }
            if change.is_removal() {
                removals.defer(change.id, change.object_type);
                continue;
            }

            let Some(item) = self.context.repository.get_by_id(change.id).await? else {
                log::debug!("{} no longer exists, removing from draft indexes", change.id);
                removals.defer(change.id, change.object_type);
                continue;
            };
            self.refresh(indexes, &item, &mut removals, &mut stats).await?;

            if change.is_branch() {
                let mut pages =
                    DescendantPages::new(self.context.repository.clone(), item.id, DRAFT_FILTER);
                while let Some(page) = pages.next_page().await? {
                    for descendant in &page {
                        self.refresh(indexes, descendant, &mut removals, &mut stats)
                            .await?;
                    }
                }
            }
        }

        stats.removed += removals
            .flush(indexes, self.context.cache.as_ref())
            .await?;
        self.context.commit(indexes).await?;
        Ok(stats)
    }

    async fn refresh(
        &self,
        indexes: &[IndexInfo],
        item: &ContentItem,
        removals: &mut RemovalBatch,
        stats: &mut ChangeStats,
    ) -> Result<()> {
        removals.cancel(item.id);
        stats.removed += removals
            .flush(indexes, self.context.cache.as_ref())
            .await?;

        let Some(document) = self.document(item) else {
            log::debug!("{} has nothing to index in draft", item.id);
            removals.defer(item.id, item.object_type);
            return Ok(());
        };
        for index in indexes.iter().filter(|i| i.accepts(item.object_type)) {
            stats.record(self.context.write_document(index, &document).await?);
        }
        Ok(())
    }

    /// Refill `index` from the content tree, trashed items included.
    pub async fn rebuild(
        &self,
        index: &IndexInfo,
        use_database: bool,
        cancellation: &CancellationFlag,
    ) -> Result<RebuildStats> {
        let mut stats = RebuildStats::default();
        let written = std::slice::from_ref(index);
        self.context.begin_rebuild(index, use_database).await?;

        for object_type in &index.contained_object_types {
            let roots = self.context.repository.get_root_items(*object_type).await?;
            for root in roots {
                if cancellation.is_cancelled() {
                    stats.cancelled = true;
                    self.context.commit(written).await?;
                    return Ok(stats);
                }
                self.rebuild_item(index, &root, use_database, &mut stats)
                    .await?;

                let mut pages =
                    DescendantPages::new(self.context.repository.clone(), root.id, DRAFT_FILTER);
                while let Some(page) = pages.next_page().await? {
                    for item in &page {
                        self.rebuild_item(index, item, use_database, &mut stats)
                            .await?;
                    }
                    self.context.commit(written).await?;
                }
            }
        }
        self.context.commit(written).await?;
        Ok(stats)
    }

    async fn rebuild_item(
        &self,
        index: &IndexInfo,
        item: &ContentItem,
        use_database: bool,
        stats: &mut RebuildStats,
    ) -> Result<()> {
        let cached = if use_database {
            self.context.cache.get(item.id, &index.alias).await?
        } else {
            None
        };

        let document = match cached {
            Some(mut document) => {
                document.protection = self.context.protection.resolve(item);
                stats.from_cache += 1;
                document
            }
            None => match self.document(item) {
                Some(document) => document,
                None => {
                    self.context.cache.delete(item.id, &index.alias).await?;
                    stats.removed += 1;
                    return Ok(());
                }
            },
        };
        stats.record(self.context.write_document(index, &document).await?);
        Ok(())
    }

    fn document(&self, item: &ContentItem) -> Option<Document> {
        let fields = self.context.collector.collect(item, false)?;
        let variations = draft_variations(item);
        if fields.is_empty() || variations.is_empty() {
            return None;
        }
        Some(Document::new(
            item.id,
            item.object_type,
            variations,
            fields,
            self.context.protection.resolve(item),
        ))
    }
}
