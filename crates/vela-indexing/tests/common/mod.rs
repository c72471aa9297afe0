//! Common test utilities and harness for indexing integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;
use vela_core::{
    ContentChange, ContentId, ContentItem, ContentRepository, DescendantFilter, Document,
    IndexField, IndexingConfig, MemoryContentRepository, ObjectType, Result,
};
use vela_fts::MemoryIndexStore;
use vela_indexing::{
    FieldProducer, IndexingOrchestrator, OrchestratorBuilder, PropertyValueFieldProducer,
    QueueMode, SystemFieldProducer,
};
use vela_storage::MemoryDocumentCache;

/// Alias of the default draft index.
pub const DRAFT: &str = "content-draft";

/// Alias of the default published index.
pub const PUBLISHED: &str = "content-published";

/// Counts how often fields were computed, without emitting any.
#[derive(Debug, Default)]
pub struct CountingProducer {
    calls: AtomicUsize,
}

impl CountingProducer {
    /// Number of `index_fields` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FieldProducer for CountingProducer {
    fn index_fields(&self, _: &ContentItem, _: &[Option<String>], _: bool) -> Vec<IndexField> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Vec::new()
    }

    fn name(&self) -> &str {
        "counting"
    }
}

/// Repository that reads an item and then stalls before returning it, so a
/// job holding a stale copy is still running when later changes arrive.
pub struct SlowRepository {
    inner: Arc<MemoryContentRepository>,
    delay: Duration,
}

impl SlowRepository {
    /// Wrap `inner`, stalling `delay` after every item lookup.
    pub fn new(inner: Arc<MemoryContentRepository>, delay: Duration) -> Self {
        Self { inner, delay }
    }
}

#[async_trait]
impl ContentRepository for SlowRepository {
    async fn get_by_id(&self, id: ContentId) -> Result<Option<ContentItem>> {
        let item = self.inner.get_by_id(id).await?;
        tokio::time::sleep(self.delay).await;
        Ok(item)
    }

    async fn get_root_items(&self, object_type: ObjectType) -> Result<Vec<ContentItem>> {
        self.inner.get_root_items(object_type).await
    }

    async fn get_paged_descendants(
        &self,
        root_id: ContentId,
        page: usize,
        page_size: usize,
        filter: DescendantFilter,
    ) -> Result<Vec<ContentItem>> {
        self.inner
            .get_paged_descendants(root_id, page, page_size, filter)
            .await
    }
}

/// Test harness wiring an orchestrator to in-memory collaborators.
pub struct TestHarness {
    /// Content tree.
    pub repository: Arc<MemoryContentRepository>,
    /// Physical indexes.
    pub store: Arc<MemoryIndexStore>,
    /// Document cache.
    pub cache: Arc<MemoryDocumentCache>,
    /// Field computation counter.
    pub counter: Arc<CountingProducer>,
    /// System under test.
    pub orchestrator: IndexingOrchestrator,
}

impl TestHarness {
    /// Harness over the default configuration, running jobs inline.
    pub async fn new() -> Self {
        Self::with(IndexingConfig::default(), |builder| builder).await
    }

    /// Harness over `config`, with extra builder customisation.
    pub async fn with<F>(config: IndexingConfig, customise: F) -> Self
    where
        F: FnOnce(OrchestratorBuilder) -> OrchestratorBuilder,
    {
        Self::assemble(config, None, customise).await
    }

    /// Harness on a background queue whose item lookups stall for `delay`.
    pub async fn slow(delay: Duration) -> Self {
        let mode = QueueMode::Background {
            workers: 4,
            capacity: 16,
        };
        Self::assemble(IndexingConfig::default(), Some(delay), |builder| {
            builder.with_queue_mode(mode)
        })
        .await
    }

    async fn assemble<F>(config: IndexingConfig, delay: Option<Duration>, customise: F) -> Self
    where
        F: FnOnce(OrchestratorBuilder) -> OrchestratorBuilder,
    {
        let repository = Arc::new(MemoryContentRepository::new());
        let store = Arc::new(MemoryIndexStore::new());
        let cache = Arc::new(MemoryDocumentCache::new());
        let counter = Arc::new(CountingProducer::default());

        let source: Arc<dyn ContentRepository> = match delay {
            Some(delay) => Arc::new(SlowRepository::new(repository.clone(), delay)),
            None => repository.clone(),
        };
        let builder = IndexingOrchestrator::builder(config)
            .with_repository(source)
            .with_producer(Arc::new(SystemFieldProducer))
            .with_producer(Arc::new(PropertyValueFieldProducer))
            .with_producer(counter.clone())
            .with_store(store.clone())
            .with_cache(cache.clone())
            .with_queue_mode(QueueMode::Immediate);
        let orchestrator = customise(builder).build().await.unwrap();

        Self {
            repository,
            store,
            cache,
            counter,
            orchestrator,
        }
    }

    /// Store `items` in the repository.
    pub fn add(&self, items: &[&ContentItem]) {
        for item in items {
            self.repository.upsert((*item).clone());
        }
    }

    /// Handle a change batch and wait for it.
    pub async fn handle(&self, changes: Vec<ContentChange>) {
        self.orchestrator.handle(changes).await.unwrap();
    }

    /// Document `id` in the active index of `alias`.
    pub fn document(&self, alias: &str, id: ContentId) -> Option<Document> {
        let physical = self.orchestrator.manager().resolve_active_index_name(alias);
        self.store.get(&physical, id)
    }

    /// Ids in the active index of `alias`, sorted.
    pub fn ids(&self, alias: &str) -> Vec<ContentId> {
        let physical = self.orchestrator.manager().resolve_active_index_name(alias);
        let mut ids: Vec<ContentId> = self
            .store
            .documents(&physical)
            .iter()
            .map(|doc| doc.document_key)
            .collect();
        ids.sort();
        ids
    }
}

/// A published, culture-invariant content item at the root.
pub fn page(name: &str) -> ContentItem {
    ContentItem::new(Uuid::new_v4(), ObjectType::Content, name)
}

/// Sorted ids of `items`.
pub fn sorted_ids(items: &[&ContentItem]) -> Vec<ContentId> {
    let mut ids: Vec<ContentId> = items.iter().map(|item| item.id).collect();
    ids.sort();
    ids
}
