//! Indexing orchestrator.
//!
//! Owns the configured indexes grouped by strategy, routes change batches to
//! every strategy, and drives rebuilds through the active/shadow slot
//! transitions. Work submitted through [`IndexingOrchestrator::handle`] and
//! [`IndexingOrchestrator::rebuild`] runs on the [`IndexingQueue`]: change
//! batches on its ordered lane, rebuilds on its concurrent lane.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use vela_acl::{NoProtection, ProtectionResolver};
use vela_core::{
    ContentChange, ContentRepository, DEFAULT_INDEXER, Error, IndexingConfig, Result,
};
use vela_fts::{
    ActiveIndexManager, HealthStatus, IndexStore, Indexer, SlottedIndexer, create_index_store,
};
use vela_storage::{DocumentCache, create_document_cache};

use crate::collector::FieldCollector;
use crate::index_info::IndexInfo;
use crate::policy::IndexingPolicy;
use crate::producers::{FieldProducer, PropertyValueFieldProducer, SystemFieldProducer};
use crate::queue::{IndexingQueue, QueueMode};
use crate::strategy::{
    CancellationFlag, ChangeStats, ChangeStrategy, IndexingContext, RebuildOutcome, StrategyKind,
};

// ============================================================================
// Orchestrator
// ============================================================================

struct StrategyGroup {
    strategy: ChangeStrategy,
    indexes: Vec<IndexInfo>,
}

struct Inner {
    groups: Vec<StrategyGroup>,
    manager: Arc<ActiveIndexManager>,
    cancellations: Mutex<HashMap<String, CancellationFlag>>,
}

impl Inner {
    fn find(&self, alias: &str) -> Option<(&ChangeStrategy, &IndexInfo)> {
        self.groups.iter().find_map(|group| {
            group
                .indexes
                .iter()
                .find(|index| index.alias == alias)
                .map(|index| (&group.strategy, index))
        })
    }

    async fn dispatch(&self, changes: &[ContentChange]) -> Result<ChangeStats> {
        let mut total = ChangeStats::default();
        let mut first_error = None;

        for group in &self.groups {
            match group.strategy.handle(&group.indexes, changes).await {
                Ok(stats) => total.merge(stats),
                Err(e) => {
                    log::error!("{} strategy failed on change batch: {e}", group.strategy.kind());
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                log::debug!(
                    "Handled {} changes: {} indexed, {} removed, {} skipped",
                    changes.len(),
                    total.indexed,
                    total.removed,
                    total.skipped_by_policy
                );
                Ok(total)
            }
        }
    }

    async fn run_rebuild(&self, alias: &str, use_database: bool) -> Result<RebuildOutcome> {
        let (strategy, index) = self
            .find(alias)
            .ok_or_else(|| Error::not_found(alias, "index"))?;

        if !self.manager.start_rebuilding(alias) {
            return Ok(RebuildOutcome::AlreadyRebuilding);
        }

        let flag = CancellationFlag::new();
        self.cancellations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(alias.to_string(), flag.clone());

        let result = async {
            index.indexer.reset(alias).await?;
            strategy.rebuild(index, use_database, &flag).await
        }
        .await;

        self.cancellations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(alias);

        match result {
            Ok(stats) if stats.cancelled => {
                self.manager.cancel_rebuilding(alias);
                log::info!(
                    "Rebuild of '{alias}' cancelled after {} documents",
                    stats.indexed
                );
                Ok(RebuildOutcome::Cancelled(stats))
            }
            Ok(stats) => {
                self.manager.complete_rebuilding(alias);
                log::info!(
                    "Rebuilt '{alias}': {} indexed ({} from cache), {} removed, {} skipped by policy",
                    stats.indexed,
                    stats.from_cache,
                    stats.removed,
                    stats.skipped_by_policy
                );
                Ok(RebuildOutcome::Completed(stats))
            }
            Err(e) => {
                self.manager.cancel_rebuilding(alias);
                log::error!("Rebuild of '{alias}' failed: {e}");
                Err(e)
            }
        }
    }
}

/// Entry point of the indexing pipeline.
///
/// Cheap to clone; clones share the queue and the slot state.
#[derive(Clone)]
pub struct IndexingOrchestrator {
    inner: Arc<Inner>,
    queue: Arc<IndexingQueue>,
}

impl IndexingOrchestrator {
    /// Start building an orchestrator from configuration.
    pub fn builder(config: IndexingConfig) -> OrchestratorBuilder {
        OrchestratorBuilder::new(config)
    }

    /// Queue a change batch for every strategy.
    ///
    /// Batches are applied one at a time in the order they were handed in,
    /// so a later change to an item never lands before an earlier one.
    pub async fn handle(&self, changes: Vec<ContentChange>) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let inner = self.inner.clone();
        self.queue
            .enqueue_ordered(Box::pin(async move {
                inner.dispatch(&changes).await.map(|_| ())
            }))
            .await
    }

    /// Apply a change batch on the caller's task.
    ///
    /// Every strategy sees the batch even if an earlier one fails; the first
    /// failure is returned.
    pub async fn dispatch(&self, changes: &[ContentChange]) -> Result<ChangeStats> {
        self.inner.dispatch(changes).await
    }

    /// Queue a rebuild of `alias`.
    ///
    /// With `use_database`, cached documents are reused and only their
    /// routability and protection are re-validated.
    pub async fn rebuild(&self, alias: &str, use_database: bool) -> Result<()> {
        if self.inner.find(alias).is_none() {
            return Err(Error::not_found(alias, "index"));
        }
        let inner = self.inner.clone();
        let alias = alias.to_string();
        self.queue
            .enqueue(Box::pin(async move {
                inner.run_rebuild(&alias, use_database).await.map(|_| ())
            }))
            .await
    }

    /// Rebuild `alias` on the caller's task.
    ///
    /// Resets the shadow slot, refills it, and promotes it on success. A
    /// cancelled or failed rebuild keeps the current active slot.
    pub async fn run_rebuild(&self, alias: &str, use_database: bool) -> Result<RebuildOutcome> {
        self.inner.run_rebuild(alias, use_database).await
    }

    /// Ask a running rebuild of `alias` to stop. Returns whether one was
    /// running.
    pub fn cancel_rebuild(&self, alias: &str) -> bool {
        let cancellations = self
            .inner
            .cancellations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match cancellations.get(alias) {
            Some(flag) => {
                log::info!("Cancelling rebuild of '{alias}'");
                flag.cancel();
                true
            }
            None => false,
        }
    }

    /// Health of the index serving `alias`.
    pub async fn health_status(&self, alias: &str) -> Result<HealthStatus> {
        let (_, index) = self
            .inner
            .find(alias)
            .ok_or_else(|| Error::not_found(alias, "index"))?;
        Ok(index.indexer.health_status(alias).await)
    }

    /// Wait until every queued job has finished.
    pub async fn wait_idle(&self, timeout: Duration) -> Result<()> {
        self.queue.wait_idle(timeout).await
    }

    /// Slot state of every alias.
    pub fn manager(&self) -> &Arc<ActiveIndexManager> {
        &self.inner.manager
    }

    /// Configured aliases, grouped by strategy in configuration order.
    pub fn aliases(&self) -> Vec<&str> {
        self.inner
            .groups
            .iter()
            .flat_map(|group| group.indexes.iter().map(|index| index.alias.as_str()))
            .collect()
    }

    /// Registration of `alias`.
    pub fn index(&self, alias: &str) -> Option<&IndexInfo> {
        self.inner.find(alias).map(|(_, index)| index)
    }
}

impl fmt::Debug for IndexingOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let groups: Vec<(StrategyKind, Vec<&str>)> = self
            .inner
            .groups
            .iter()
            .map(|g| {
                (
                    g.strategy.kind(),
                    g.indexes.iter().map(|i| i.alias.as_str()).collect(),
                )
            })
            .collect();
        f.debug_struct("IndexingOrchestrator")
            .field("groups", &groups)
            .field("queue", &self.queue)
            .finish()
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles an [`IndexingOrchestrator`] from configuration and
/// collaborators.
pub struct OrchestratorBuilder {
    config: IndexingConfig,
    repository: Option<Arc<dyn ContentRepository>>,
    producers: Vec<Arc<dyn FieldProducer>>,
    protection: Option<Arc<dyn ProtectionResolver>>,
    cache: Option<Arc<dyn DocumentCache>>,
    store: Option<Arc<dyn IndexStore>>,
    indexers: HashMap<String, Arc<dyn Indexer>>,
    policies: Vec<Arc<dyn IndexingPolicy>>,
    queue_mode: Option<QueueMode>,
}

impl OrchestratorBuilder {
    /// Start from `config`.
    pub fn new(config: IndexingConfig) -> Self {
        Self {
            config,
            repository: None,
            producers: Vec::new(),
            protection: None,
            cache: None,
            store: None,
            indexers: HashMap::new(),
            policies: Vec::new(),
            queue_mode: None,
        }
    }

    /// Content source. Required.
    pub fn with_repository(mut self, repository: Arc<dyn ContentRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Register a field producer. Exactly one must supply system fields.
    pub fn with_producer(mut self, producer: Arc<dyn FieldProducer>) -> Self {
        self.producers.push(producer);
        self
    }

    /// Register the built-in system and property value producers.
    pub fn with_default_producers(self) -> Self {
        self.with_producer(Arc::new(SystemFieldProducer))
            .with_producer(Arc::new(PropertyValueFieldProducer))
    }

    /// Protection lookup. Defaults to [`NoProtection`].
    pub fn with_protection(mut self, protection: Arc<dyn ProtectionResolver>) -> Self {
        self.protection = Some(protection);
        self
    }

    /// Use this cache instead of the configured backend.
    pub fn with_cache(mut self, cache: Arc<dyn DocumentCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Use this physical store instead of the configured backend.
    pub fn with_store(mut self, store: Arc<dyn IndexStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Register an indexer under its own name, replacing any earlier one.
    pub fn with_indexer(mut self, indexer: Arc<dyn Indexer>) -> Self {
        self.indexers.insert(indexer.name().to_string(), indexer);
        self
    }

    /// Add a write veto.
    pub fn with_policy(mut self, policy: Arc<dyn IndexingPolicy>) -> Self {
        self.policies.push(policy);
        self
    }

    /// Override the configured queue mode.
    pub fn with_queue_mode(mut self, mode: QueueMode) -> Self {
        self.queue_mode = Some(mode);
        self
    }

    /// Validate the configuration and assemble the orchestrator.
    ///
    /// Fails with a configuration error, before any write, on an invalid
    /// configuration, a missing repository, a missing or duplicated system
    /// producer, or an index naming an unknown strategy or indexer.
    pub async fn build(self) -> Result<IndexingOrchestrator> {
        self.config.validate()?;

        let repository = self
            .repository
            .ok_or_else(|| Error::config("a content repository is required"))?;
        let collector = Arc::new(FieldCollector::new(self.producers)?);

        let store = match self.store {
            Some(store) => store,
            None => create_index_store(&self.config.store)?,
        };
        let manager = Arc::new(ActiveIndexManager::new(store));

        let cache = match self.cache {
            Some(cache) => cache,
            None => create_document_cache(&self.config.cache).await?,
        };

        let mut indexers = self.indexers;
        indexers
            .entry(DEFAULT_INDEXER.to_string())
            .or_insert_with(|| Arc::new(SlottedIndexer::new(DEFAULT_INDEXER, manager.clone())));

        let context = IndexingContext {
            repository,
            collector,
            protection: self.protection.unwrap_or_else(|| Arc::new(NoProtection)),
            cache,
            policies: self.policies,
        };

        let mut groups: Vec<StrategyGroup> = Vec::new();
        for index in &self.config.indexes {
            let kind: StrategyKind = index.strategy.parse()?;
            let indexer = indexers.get(&index.indexer).cloned().ok_or_else(|| {
                Error::config(format!(
                    "index '{}' uses unknown indexer '{}'",
                    index.alias, index.indexer
                ))
            })?;
            let info = IndexInfo::new(&index.alias, index.object_types.iter().copied(), indexer);

            match groups.iter_mut().find(|g| g.strategy.kind() == kind) {
                Some(group) => group.indexes.push(info),
                None => groups.push(StrategyGroup {
                    strategy: ChangeStrategy::new(kind, context.clone()),
                    indexes: vec![info],
                }),
            }
        }

        let mode = self
            .queue_mode
            .unwrap_or_else(|| QueueMode::from_config(&self.config.queue));
        log::info!(
            "Indexing orchestrator ready: {} indexes in {} strategies, cache '{}', store '{}'",
            self.config.indexes.len(),
            groups.len(),
            context.cache.name(),
            manager.store().name()
        );

        Ok(IndexingOrchestrator {
            inner: Arc::new(Inner {
                groups,
                manager,
                cancellations: Mutex::new(HashMap::new()),
            }),
            queue: Arc::new(IndexingQueue::new(mode)),
        })
    }
}

impl fmt::Debug for OrchestratorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrchestratorBuilder")
            .field("config", &self.config)
            .field("producers", &self.producers.len())
            .field("indexers", &self.indexers.keys().collect::<Vec<_>>())
            .field("policies", &self.policies.len())
            .field("queue_mode", &self.queue_mode)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
