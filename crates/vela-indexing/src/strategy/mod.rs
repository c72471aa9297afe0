//! Change strategies.
//!
//! A strategy turns content change batches into index writes and removals
//! for the indexes it owns, and rebuilds one index from the content tree.
//! [`DraftStrategy`] indexes the editable version of every item;
//! [`PublishedStrategy`] indexes only what is routable on the public site.

mod draft;
mod published;

pub use draft::DraftStrategy;
pub use published::PublishedStrategy;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use vela_acl::ProtectionResolver;
use vela_core::{
    ContentChange, ContentId, ContentItem, ContentRepository, DRAFT_STRATEGY, Document, Error,
    PUBLISHED_STRATEGY, Result,
};
use vela_storage::DocumentCache;

use crate::collector::FieldCollector;
use crate::index_info::IndexInfo;
use crate::policy::{IndexingPolicy, PolicyDecision, WriteOutcome};

// ============================================================================
// Shared context
// ============================================================================

/// Collaborators shared by every strategy of one orchestrator.
#[derive(Clone)]
pub struct IndexingContext {
    /// Source of content items.
    pub repository: Arc<dyn ContentRepository>,
    /// Field collection over the registered producers.
    pub collector: Arc<FieldCollector>,
    /// Access restriction lookup.
    pub protection: Arc<dyn ProtectionResolver>,
    /// Last document written per `(item, index)`.
    pub cache: Arc<dyn DocumentCache>,
    /// Per-index write vetoes, consulted in order.
    pub policies: Vec<Arc<dyn IndexingPolicy>>,
}

impl IndexingContext {
    /// Write one document to one index and record it in the cache.
    ///
    /// The first policy returning [`PolicyDecision::Skip`] vetoes the write;
    /// neither the index nor the cache is touched.
    pub async fn write_document(
        &self,
        index: &IndexInfo,
        document: &Document,
    ) -> Result<WriteOutcome> {
        if self
            .policies
            .iter()
            .any(|policy| policy.decide(index, document) == PolicyDecision::Skip)
        {
            log::debug!(
                "Policy skipped {} for '{}'",
                document.document_key,
                index.alias
            );
            return Ok(WriteOutcome::SkippedByPolicy);
        }

        index.indexer.add_or_update(&index.alias, document).await?;
        self.cache.put(&index.alias, document).await?;
        Ok(WriteOutcome::Written)
    }

    /// Commit the writes staged on every index in `indexes`.
    pub async fn commit(&self, indexes: &[IndexInfo]) -> Result<()> {
        for index in indexes {
            index.indexer.commit(&index.alias).await?;
        }
        Ok(())
    }

    /// Prepare the cache for a rebuild of `index`.
    ///
    /// A rebuild that recomputes every document drops the alias's cached
    /// rows first, so rows of items that left the tree do not outlive it.
    pub(crate) async fn begin_rebuild(&self, index: &IndexInfo, use_database: bool) -> Result<()> {
        if !use_database {
            log::debug!("Clearing cached documents of '{}'", index.alias);
            self.cache.clear(&index.alias).await?;
        }
        Ok(())
    }
}

impl fmt::Debug for IndexingContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexingContext")
            .field("collector", &self.collector)
            .field("cache", &self.cache.name())
            .field("policies", &self.policies.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Statistics and outcomes
// ============================================================================

/// Counters for one handled change batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeStats {
    /// `(document, index)` writes.
    pub indexed: usize,
    /// Ids removed from the indexes.
    pub removed: usize,
    /// `(document, index)` writes vetoed by a policy.
    pub skipped_by_policy: usize,
}

impl ChangeStats {
    pub(crate) fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Written => self.indexed += 1,
            WriteOutcome::SkippedByPolicy => self.skipped_by_policy += 1,
        }
    }

    /// Add another batch's counters.
    pub fn merge(&mut self, other: ChangeStats) {
        self.indexed += other.indexed;
        self.removed += other.removed;
        self.skipped_by_policy += other.skipped_by_policy;
    }
}

/// Counters for one rebuild.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildStats {
    /// Documents written.
    pub indexed: usize,
    /// Items left out because nothing was indexable.
    pub removed: usize,
    /// Documents taken from the cache instead of recomputed.
    pub from_cache: usize,
    /// Writes vetoed by a policy.
    pub skipped_by_policy: usize,
    /// Whether the rebuild stopped on cancellation.
    pub cancelled: bool,
}

impl RebuildStats {
    pub(crate) fn record(&mut self, outcome: WriteOutcome) {
        match outcome {
            WriteOutcome::Written => self.indexed += 1,
            WriteOutcome::SkippedByPolicy => self.skipped_by_policy += 1,
        }
    }
}

/// Result of a rebuild request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "stats", rename_all = "snake_case")]
pub enum RebuildOutcome {
    /// Shadow filled and promoted.
    Completed(RebuildStats),
    /// Stopped on request; the active slot was kept.
    Cancelled(RebuildStats),
    /// Another rebuild of the alias was running; nothing was done.
    AlreadyRebuilding,
}

/// Cooperative cancellation signal for a running rebuild.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Per-dispatch item state
// ============================================================================

/// Decision reached for an item during one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemState {
    /// Written to at least one index (or vetoed by policy).
    Indexed,
    /// Scheduled for removal.
    Removed,
}

#[derive(Debug, Default)]
pub(crate) struct DispatchState {
    items: HashMap<ContentId, ItemState>,
}

impl DispatchState {
    pub(crate) fn mark(&mut self, id: ContentId, state: ItemState) {
        self.items.insert(id, state);
    }

    pub(crate) fn get(&self, id: ContentId) -> Option<ItemState> {
        self.items.get(&id).copied()
    }

    pub(crate) fn has_removed_ancestor(&self, item: &ContentItem) -> bool {
        item.ancestor_ids()
            .iter()
            .any(|id| self.get(*id) == Some(ItemState::Removed))
    }
}

// ============================================================================
// Strategy selection
// ============================================================================

/// Configured strategy name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Editable versions, including unpublished and trashed items.
    Draft,
    /// Routable published versions only.
    Published,
}

impl StrategyKind {
    /// Name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => DRAFT_STRATEGY,
            Self::Published => PUBLISHED_STRATEGY,
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            DRAFT_STRATEGY => Ok(Self::Draft),
            PUBLISHED_STRATEGY => Ok(Self::Published),
            other => Err(Error::config(format!("unknown strategy '{other}'"))),
        }
    }
}

/// A change strategy, resolved from its configured name.
#[derive(Debug, Clone)]
pub enum ChangeStrategy {
    /// See [`DraftStrategy`].
    Draft(DraftStrategy),
    /// See [`PublishedStrategy`].
    Published(PublishedStrategy),
}

impl ChangeStrategy {
    /// Create the strategy of `kind` over `context`.
    pub fn new(kind: StrategyKind, context: IndexingContext) -> Self {
        match kind {
            StrategyKind::Draft => Self::Draft(DraftStrategy::new(context)),
            StrategyKind::Published => Self::Published(PublishedStrategy::new(context)),
        }
    }

    /// Which strategy this is.
    pub fn kind(&self) -> StrategyKind {
        match self {
            Self::Draft(_) => StrategyKind::Draft,
            Self::Published(_) => StrategyKind::Published,
        }
    }

    /// Apply a change batch to `indexes`.
    pub async fn handle(
        &self,
        indexes: &[IndexInfo],
        changes: &[ContentChange],
    ) -> Result<ChangeStats> {
        match self {
            Self::Draft(strategy) => strategy.handle(indexes, changes).await,
            Self::Published(strategy) => strategy.handle(indexes, changes).await,
        }
    }

    /// Refill `index` from the content tree.
    ///
    /// Writes go wherever the index's indexer currently writes; the caller
    /// owns the slot transitions.
    pub async fn rebuild(
        &self,
        index: &IndexInfo,
        use_database: bool,
        cancellation: &CancellationFlag,
    ) -> Result<RebuildStats> {
        match self {
            Self::Draft(strategy) => strategy.rebuild(index, use_database, cancellation).await,
            Self::Published(strategy) => strategy.rebuild(index, use_database, cancellation).await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
