//! Change handling and rebuild orchestration for the Vela indexing pipeline.
//!
//! Content change batches flow through the [`IndexingOrchestrator`] to one
//! [`ChangeStrategy`] per configured strategy name. Strategies build
//! [`Document`](vela_core::Document)s with the [`FieldCollector`], the
//! variation rules in [`variations`], and a
//! [`ProtectionResolver`](vela_acl::ProtectionResolver), then write them
//! through each index's [`Indexer`](vela_fts::Indexer) and record them in the
//! [`DocumentCache`](vela_storage::DocumentCache).
//!
//! # Architecture
//!
//! ```text
//! ContentChange batch
//!        │
//!        ▼
//! IndexingOrchestrator ──► IndexingQueue (immediate | background)
//!        │
//!        ├── DraftStrategy      (available cultures, trashed included)
//!        └── PublishedStrategy  (routable published variations only)
//!                 │
//!                 ├── FieldCollector ── FieldProducer*
//!                 ├── ProtectionResolver
//!                 ├── RemovalBatch ──► Indexer::delete
//!                 └── write_document ──► Indexer::add_or_update + DocumentCache::put
//! ```
//!
//! Rebuilds reset and refill the shadow slot of an alias, then promote it
//! through the [`ActiveIndexManager`](vela_fts::ActiveIndexManager).
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vela_core::{IndexingConfig, MemoryContentRepository};
//! use vela_indexing::IndexingOrchestrator;
//!
//! let orchestrator = IndexingOrchestrator::builder(IndexingConfig::default())
//!     .with_repository(Arc::new(MemoryContentRepository::new()))
//!     .with_default_producers()
//!     .build()
//!     .await?;
//! orchestrator.rebuild("content-published", true).await?;
//! ```

pub mod collector;
pub mod descendants;
pub mod index_info;
pub mod orchestrator;
pub mod policy;
pub mod producers;
pub mod queue;
pub mod removal;
pub mod strategy;
pub mod variations;

pub use collector::{CollectReport, DuplicateField, FieldCollector};
pub use descendants::DescendantPages;
pub use index_info::IndexInfo;
pub use orchestrator::{IndexingOrchestrator, OrchestratorBuilder};
pub use policy::{IndexingPolicy, PolicyDecision, WriteOutcome};
pub use producers::{FieldProducer, PropertyValueFieldProducer, SystemFieldProducer};
pub use queue::{IndexingQueue, Job, QueueMode};
pub use removal::RemovalBatch;
pub use strategy::{
    CancellationFlag, ChangeStats, ChangeStrategy, DraftStrategy, IndexingContext, ItemState,
    PublishedStrategy, RebuildOutcome, RebuildStats, StrategyKind,
};
pub use variations::{AncestorCache, draft_variations, routable_published_variations};

pub use vela_core::{Error, Result};
