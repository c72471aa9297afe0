//! Indexing configuration.
//!
//! The host describes its logical indexes, the strategy and indexer each one
//! uses, and the backends for the work queue, document cache and physical
//! index store. Configuration is read from TOML; every section has defaults.
//!
//! ```toml
//! [[indexes]]
//! alias = "content-published"
//! strategy = "published"
//! object_types = ["content", "media"]
//!
//! [cache]
//! backend = "sqlite"
//! path = "/var/lib/vela/cache.db"
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::content::ObjectType;
use crate::error::{Error, Result};

/// Strategy name for draft indexes.
pub const DRAFT_STRATEGY: &str = "draft";

/// Strategy name for published indexes.
pub const PUBLISHED_STRATEGY: &str = "published";

/// Name of the indexer registered when none is configured.
pub const DEFAULT_INDEXER: &str = "default";

/// Top-level indexing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Logical indexes.
    #[serde(default = "default_indexes")]
    pub indexes: Vec<IndexConfig>,

    /// Background work queue.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Persisted document cache.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Physical index store.
    #[serde(default)]
    pub store: StoreConfig,
}

/// Registration of one logical index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Logical alias.
    pub alias: String,

    /// Strategy name: "draft" or "published".
    pub strategy: String,

    /// Object types routed to this index.
    pub object_types: Vec<ObjectType>,

    /// Name of the registered indexer that writes this index.
    #[serde(default = "default_indexer")]
    pub indexer: String,
}

/// Work queue settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of rebuild jobs running concurrently. Change batches
    /// always run one at a time, in order.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Maximum number of queued jobs before `enqueue` waits.
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Run jobs inline instead of in the background.
    #[serde(default)]
    pub immediate: bool,
}

/// Document cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Backend type: "memory" or "sqlite".
    #[serde(default = "default_cache_backend")]
    pub backend: String,

    /// Database file for the SQLite backend.
    pub path: Option<String>,
}

/// Physical index store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend type: "memory" or "tantivy".
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Root directory for on-disk indexes; in memory when absent.
    pub path: Option<String>,
}

fn default_indexes() -> Vec<IndexConfig> {
    vec![
        IndexConfig {
            alias: "content-draft".to_string(),
            strategy: DRAFT_STRATEGY.to_string(),
            object_types: ObjectType::ALL.to_vec(),
            indexer: default_indexer(),
        },
        IndexConfig {
            alias: "content-published".to_string(),
            strategy: PUBLISHED_STRATEGY.to_string(),
            object_types: vec![ObjectType::Content, ObjectType::Media],
            indexer: default_indexer(),
        },
    ]
}

fn default_indexer() -> String {
    DEFAULT_INDEXER.to_string()
}

fn default_workers() -> usize {
    4
}

fn default_capacity() -> usize {
    256
}

fn default_cache_backend() -> String {
    "memory".to_string()
}

fn default_store_backend() -> String {
    "memory".to_string()
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            indexes: default_indexes(),
            queue: QueueConfig::default(),
            cache: CacheConfig::default(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            capacity: default_capacity(),
            immediate: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: default_cache_backend(),
            path: None,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

impl IndexingConfig {
    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::parse(format!("Invalid indexing config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        let config = Self::from_toml_str(&content)?;
        log::debug!(
            "Loaded indexing config from {} ({} indexes)",
            path.display(),
            config.indexes.len()
        );
        Ok(config)
    }

    /// Serialize to pretty TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| Error::operation(format!("Failed to serialize config: {e}")))
    }

    /// Look up an index registration by alias.
    pub fn index(&self, alias: &str) -> Option<&IndexConfig> {
        self.indexes.iter().find(|i| i.alias == alias)
    }

    /// Check structural consistency.
    ///
    /// Rejects duplicate aliases, indexes without object types, unknown
    /// strategy names, and a zero-sized queue.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for index in &self.indexes {
            if index.alias.trim().is_empty() {
                return Err(Error::config("index alias must not be empty"));
            }
            if !seen.insert(index.alias.as_str()) {
                return Err(Error::config(format!(
                    "duplicate index alias '{}'",
                    index.alias
                )));
            }
            if index.object_types.is_empty() {
                return Err(Error::config(format!(
                    "index '{}' contains no object types",
                    index.alias
                )));
            }
            if !matches!(index.strategy.as_str(), DRAFT_STRATEGY | PUBLISHED_STRATEGY) {
                return Err(Error::config(format!(
                    "index '{}' uses unknown strategy '{}'",
                    index.alias, index.strategy
                )));
            }
        }
        if self.queue.workers == 0 || self.queue.capacity == 0 {
            return Err(Error::config("queue workers and capacity must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
