//! Published change strategy.

use vela_core::{
    ContentChange, ContentItem, ContentState, DescendantFilter, Document, Result, Variation,
};

use super::{
    CancellationFlag, ChangeStats, DispatchState, IndexingContext, ItemState, RebuildStats,
};
use crate::descendants::DescendantPages;
use crate::index_info::IndexInfo;
use crate::removal::RemovalBatch;
use crate::variations::{AncestorCache, routable_published_variations};

const PUBLISHED_FILTER: DescendantFilter = DescendantFilter {
    include_trashed: false,
};

/// Indexes the published version of items, restricted to the variations
/// that are routable through every ancestor.
#[derive(Debug, Clone)]
pub struct PublishedStrategy {
    context: IndexingContext,
}

impl PublishedStrategy {
    /// Create the strategy.
    pub fn new(context: IndexingContext) -> Self {
        Self { context }
    }

    /// Apply a change batch.
    ///
    /// Removal decisions cascade down a refreshed branch: a descendant of an
    /// item removed in this batch is removed without being recomputed.
    pub async fn handle(
        &self,
        indexes: &[IndexInfo],
        changes: &[ContentChange],
    ) -> Result<ChangeStats> {
        let mut stats = ChangeStats::default();
        let mut removals = RemovalBatch::new();
        let mut state = DispatchState::default();
        let mut ancestors = AncestorCache::new(self.context.repository.clone());

        let relevant = changes
            .iter()
            .filter(|c| c.content_state == ContentState::Published);
        for change in relevant {
            if !indexes.iter().any(|index| index.accepts(change.object_type)) {
                continue;
            }
            if change.is_removal() {
                removals.defer(change.id, change.object_type);
                state.mark(change.id, ItemState::Removed);
                continue;
            }

            let item = match self.context.repository.get_by_id(change.id).await? {
                Some(item) if !item.trashed => item,
                _ => {
                    log::debug!("{} is gone or trashed, unpublishing", change.id);
                    removals.defer(change.id, change.object_type);
                    state.mark(change.id, ItemState::Removed);
                    continue;
                }
            };
            self.refresh(
                indexes,
                &item,
                &mut removals,
                &mut state,
                &mut ancestors,
                &mut stats,
            )
            .await?;

            if change.is_branch() {
                let mut pages = DescendantPages::new(
                    self.context.repository.clone(),
                    item.id,
                    PUBLISHED_FILTER,
                );
                while let Some(page) = pages.next_page().await? {
                    for descendant in &page {
                        self.refresh(
                            indexes,
                            descendant,
                            &mut removals,
                            &mut state,
                            &mut ancestors,
                            &mut stats,
                        )
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
        state: &mut DispatchState,
        ancestors: &mut AncestorCache,
        stats: &mut ChangeStats,
    ) -> Result<()> {
        ancestors.insert(item);

        if state.has_removed_ancestor(item) {
            removals.defer(item.id, item.object_type);
            state.mark(item.id, ItemState::Removed);
            return Ok(());
        }

        removals.cancel(item.id);
        stats.removed += removals
            .flush(indexes, self.context.cache.as_ref())
            .await?;

        let variations = routable_published_variations(item, ancestors).await?;
        let Some(document) = self.document(item, variations) else {
            log::debug!("{} has no routable published variations", item.id);
            removals.defer(item.id, item.object_type);
            state.mark(item.id, ItemState::Removed);
            return Ok(());
        };

        for index in indexes.iter().filter(|i| i.accepts(item.object_type)) {
            stats.record(self.context.write_document(index, &document).await?);
        }
        state.mark(item.id, ItemState::Indexed);
        Ok(())
    }

    /// Refill `index` with the routable published content.
    pub async fn rebuild(
        &self,
        index: &IndexInfo,
        use_database: bool,
        cancellation: &CancellationFlag,
    ) -> Result<RebuildStats> {
        let mut stats = RebuildStats::default();
        let mut state = DispatchState::default();
        let mut ancestors = AncestorCache::new(self.context.repository.clone());
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
                self.rebuild_item(
                    index,
                    &root,
                    use_database,
                    &mut state,
                    &mut ancestors,
                    &mut stats,
                )
                .await?;

                let mut pages = DescendantPages::new(
                    self.context.repository.clone(),
                    root.id,
                    PUBLISHED_FILTER,
                );
                while let Some(page) = pages.next_page().await? {
                    for item in &page {
                        self.rebuild_item(
                            index,
                            item,
                            use_database,
                            &mut state,
                            &mut ancestors,
                            &mut stats,
                        )
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
        state: &mut DispatchState,
        ancestors: &mut AncestorCache,
        stats: &mut RebuildStats,
    ) -> Result<()> {
        ancestors.insert(item);

        let variations = if item.trashed || state.has_removed_ancestor(item) {
            Vec::new()
        } else {
            routable_published_variations(item, ancestors).await?
        };

        let document = if variations.is_empty() {
            None
        } else {
            let cached = if use_database {
                self.context.cache.get(item.id, &index.alias).await?
            } else {
                None
            };
            match cached {
                Some(cached) => {
                    let reused = self.revalidate(item, cached, &variations);
                    if reused.is_some() {
                        stats.from_cache += 1;
                    }
                    reused
                }
                None => self.document(item, variations),
            }
        };

        let Some(document) = document else {
            self.context.cache.delete(item.id, &index.alias).await?;
            state.mark(item.id, ItemState::Removed);
            stats.removed += 1;
            return Ok(());
        };
        stats.record(self.context.write_document(index, &document).await?);
        state.mark(item.id, ItemState::Indexed);
        Ok(())
    }

    /// Narrow a cached document to the currently routable variations and
    /// refresh its protection. `None` when no cached variation is routable.
    fn revalidate(
        &self,
        item: &ContentItem,
        mut cached: Document,
        routable: &[Variation],
    ) -> Option<Document> {
        let keep: Vec<Variation> = cached
            .variations
            .iter()
            .filter(|v| routable.contains(v))
            .cloned()
            .collect();
        if keep.is_empty() {
            return None;
        }
        cached.restrict_to(keep);
        cached.protection = self.context.protection.resolve(item);
        Some(cached)
    }

    fn document(&self, item: &ContentItem, variations: Vec<Variation>) -> Option<Document> {
        if variations.is_empty() {
            return None;
        }
        let fields = self.context.collector.collect(item, true)?;
        if fields.is_empty() {
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
