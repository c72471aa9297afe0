//! Indexers addressed by logical alias.
//!
//! [`SlottedIndexer`] maps every alias to its current write slot through the
//! [`ActiveIndexManager`], so a rebuild transparently writes into the shadow
//! index while readers keep using the active one.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vela_core::{ContentId, Document, Result};

use crate::slots::ActiveIndexManager;
use crate::store::IndexStore;

/// Health of the physical index currently serving an alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Exists and holds documents.
    Healthy,
    /// Exists but holds no documents.
    Empty,
    /// A rebuild is in progress.
    Rebuilding,
    /// Exists but cannot be read.
    Corrupted,
    /// Has never been created.
    Unknown,
}

/// Writes documents into the physical index behind a logical alias.
#[async_trait]
pub trait Indexer: Send + Sync {
    /// Insert or replace a document.
    async fn add_or_update(&self, alias: &str, document: &Document) -> Result<()>;

    /// Delete documents and all of their descendants. Returns the keys of
    /// every removed document, descendants included.
    async fn delete(&self, alias: &str, ids: &[ContentId]) -> Result<Vec<ContentId>>;

    /// Empty the index that writes currently go to.
    async fn reset(&self, alias: &str) -> Result<()>;

    /// Make earlier writes for `alias` durable and searchable.
    async fn commit(&self, alias: &str) -> Result<()>;

    /// Health of the active index.
    async fn health_status(&self, alias: &str) -> HealthStatus;

    /// Registered name of the indexer.
    fn name(&self) -> &str;
}

/// Indexer writing into the current write slot of each alias.
pub struct SlottedIndexer {
    name: String,
    manager: Arc<ActiveIndexManager>,
}

impl SlottedIndexer {
    /// Create an indexer over the manager's store.
    pub fn new(name: impl Into<String>, manager: Arc<ActiveIndexManager>) -> Self {
        Self {
            name: name.into(),
            manager,
        }
    }

    fn store(&self) -> &dyn IndexStore {
        self.manager.store().as_ref()
    }
}

#[async_trait]
impl Indexer for SlottedIndexer {
    async fn add_or_update(&self, alias: &str, document: &Document) -> Result<()> {
        let physical = self.manager.resolve_write_index_name(alias);
        log::debug!("Indexing {} into {physical}", document.document_key);
        self.store().upsert(&physical, document)
    }

    async fn delete(&self, alias: &str, ids: &[ContentId]) -> Result<Vec<ContentId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let physical = self.manager.resolve_write_index_name(alias);
        log::debug!("Deleting {} item(s) from {physical}", ids.len());
        self.store().delete(&physical, ids)
    }

    async fn reset(&self, alias: &str) -> Result<()> {
        let physical = self.manager.resolve_write_index_name(alias);
        log::info!("Resetting {physical}");
        self.store().reset(&physical)
    }

    async fn commit(&self, alias: &str) -> Result<()> {
        // A rebuild may have started after earlier writes reached the active slot.
        let active = self.manager.resolve_active_index_name(alias);
        self.store().commit(&active)?;
        if self.manager.is_rebuilding(alias) {
            let shadow = self.manager.resolve_shadow_index_name(alias);
            self.store().commit(&shadow)?;
        }
        Ok(())
    }

    async fn health_status(&self, alias: &str) -> HealthStatus {
        if self.manager.is_rebuilding(alias) {
            return HealthStatus::Rebuilding;
        }
        let physical = self.manager.resolve_active_index_name(alias);
        if !self.store().contains(&physical) {
            return HealthStatus::Unknown;
        }
        match self.store().document_count(&physical) {
            Ok(0) => HealthStatus::Empty,
            Ok(_) => HealthStatus::Healthy,
            Err(e) => {
                log::warn!("Health check of {physical} failed: {e}");
                HealthStatus::Corrupted
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for SlottedIndexer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlottedIndexer")
            .field("name", &self.name)
            .field("store", &self.store().name())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
