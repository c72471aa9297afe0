//! SQLite-backed document cache.
//!
//! Documents are stored as JSON in the `document_cache` table keyed by
//! `(item_id, index_alias)`. Writes delete the previous row and insert the
//! new one inside a single transaction.

use std::path::Path;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use vela_core::{ContentId, Document, Error, Result};

use crate::cache::DocumentCache;

const CREATE_TABLE: &str = "\
    CREATE TABLE IF NOT EXISTS document_cache (\
        item_id TEXT NOT NULL, \
        index_alias TEXT NOT NULL, \
        object_type TEXT NOT NULL, \
        payload TEXT NOT NULL, \
        updated_at TEXT NOT NULL, \
        PRIMARY KEY (item_id, index_alias)\
    )";

/// Document cache persisted in SQLite.
#[derive(Debug, Clone)]
pub struct SqliteDocumentCache {
    pool: SqlitePool,
}

impl SqliteDocumentCache {
    /// Open (or create) a cache database file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| Error::io_with_path(e, parent))?;
        }
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .map_err(|e| {
                Error::storage_with_source(
                    format!("Failed to open document cache at {}", path.display()),
                    e,
                )
            })?;
        log::info!("Opened document cache at {}", path.display());
        Self::with_pool(pool).await
    }

    /// Create a cache in a private in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| Error::storage_with_source("Invalid in-memory cache options", e))?;
        // Every connection to `sqlite::memory:` gets its own database, so the
        // pool must hold exactly one connection for its whole lifetime.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| Error::storage_with_source("Failed to open in-memory cache", e))?;
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, creating the cache table if needed.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self> {
        sqlx::query(CREATE_TABLE)
            .execute(&pool)
            .await
            .map_err(|e| Error::storage_with_source("Failed to create document_cache table", e))?;
        Ok(Self { pool })
    }

    /// Number of cached rows for an alias.
    pub async fn count(&self, alias: &str) -> Result<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM document_cache WHERE index_alias = ?")
                .bind(alias)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| Error::storage_with_source("Failed to count cached documents", e))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

#[async_trait]
impl DocumentCache for SqliteDocumentCache {
    async fn get(&self, id: ContentId, alias: &str) -> Result<Option<Document>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT payload FROM document_cache WHERE item_id = ? AND index_alias = ?",
        )
        .bind(id.to_string())
        .bind(alias)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::storage_with_source(format!("Failed to read cached {id}"), e))?;

        match row {
            Some((payload,)) => Ok(Some(serde_json::from_str(&payload)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, alias: &str, document: &Document) -> Result<()> {
        let id = document.document_key.to_string();
        let payload = serde_json::to_string(document)?;
        let write_err =
            |e: sqlx::Error| Error::storage_with_source(format!("Failed to cache {id}"), e);

        let mut tx = self.pool.begin().await.map_err(write_err)?;
        sqlx::query("DELETE FROM document_cache WHERE item_id = ? AND index_alias = ?")
            .bind(&id)
            .bind(alias)
            .execute(&mut *tx)
            .await
            .map_err(write_err)?;
        sqlx::query(
            "INSERT INTO document_cache (item_id, index_alias, object_type, payload, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(alias)
        .bind(document.object_type.as_str())
        .bind(&payload)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(write_err)?;
        tx.commit().await.map_err(write_err)?;
        Ok(())
    }

    async fn delete(&self, id: ContentId, alias: &str) -> Result<()> {
        sqlx::query("DELETE FROM document_cache WHERE item_id = ? AND index_alias = ?")
            .bind(id.to_string())
            .bind(alias)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source(format!("Failed to delete cached {id}"), e))?;
        Ok(())
    }

    async fn clear(&self, alias: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM document_cache WHERE index_alias = ?")
            .bind(alias)
            .execute(&self.pool)
            .await
            .map_err(|e| Error::storage_with_source(format!("Failed to clear cache {alias}"), e))?;
        log::info!(
            "Cleared {} cached documents for '{alias}'",
            result.rows_affected()
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
