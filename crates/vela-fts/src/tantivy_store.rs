//! Tantivy-backed physical index store.
//!
//! Each physical index is its own Tantivy index: a sub-directory of the
//! store root, or a RAM index when the store has no root. Upserts and
//! deletes are staged on the index writer and committed every
//! [`COMMIT_BATCH_SIZE`] operations, on [`IndexStore::commit`], or before a
//! read, so counts and health checks always observe earlier writes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tantivy::collector::DocSetCollector;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{IndexRecordOption, Value};
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Searcher, TantivyDocument, Term};
use vela_core::{ContentId, Document, Error, Result};

use crate::schema::DocumentSchema;
use crate::store::IndexStore;

/// Index writer buffer size (50MB).
const WRITER_BUFFER_SIZE: usize = 50_000_000;

/// Staged operations after which the writer commits on its own.
pub const COMMIT_BATCH_SIZE: usize = 500;

struct StagedWriter {
    writer: IndexWriter,
    staged: usize,
}

struct PhysicalIndex {
    reader: IndexReader,
    writer: Mutex<StagedWriter>,
}

impl PhysicalIndex {
    fn new(index: Index) -> Result<Self> {
        DocumentSchema::register_tokenizers(&index);

        let reader = index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()
            .map_err(|e| Error::operation(format!("Failed to create index reader: {e}")))?;
        let writer = index
            .writer(WRITER_BUFFER_SIZE)
            .map_err(|e| Error::operation(format!("Failed to create index writer: {e}")))?;

        Ok(Self {
            reader,
            writer: Mutex::new(StagedWriter { writer, staged: 0 }),
        })
    }

    /// Stage one operation, committing once a full batch is staged.
    fn stage<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut IndexWriter) -> Result<()>,
    {
        let mut staged = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut staged.writer)?;
        staged.staged += 1;
        if staged.staged >= COMMIT_BATCH_SIZE {
            self.commit_locked(&mut staged)?;
        }
        Ok(())
    }

    /// Apply an operation and commit it together with anything staged.
    fn write_now<F>(&self, op: F) -> Result<()>
    where
        F: FnOnce(&mut IndexWriter) -> Result<()>,
    {
        let mut staged = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        op(&mut staged.writer)?;
        staged.staged += 1;
        self.commit_locked(&mut staged)
    }

    fn commit(&self) -> Result<()> {
        let mut staged = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if staged.staged == 0 {
            return Ok(());
        }
        self.commit_locked(&mut staged)
    }

    fn commit_locked(&self, staged: &mut StagedWriter) -> Result<()> {
        staged
            .writer
            .commit()
            .map_err(|e| Error::operation(format!("Failed to commit index: {e}")))?;
        staged.staged = 0;
        self.reader
            .reload()
            .map_err(|e| Error::operation(format!("Failed to reload index reader: {e}")))
    }

    /// A searcher over every write made so far.
    fn searcher(&self) -> Result<Searcher> {
        self.commit()?;
        Ok(self.reader.searcher())
    }

    fn staged(&self) -> usize {
        self.writer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .staged
    }
}

/// Index store writing Tantivy indexes.
pub struct TantivyIndexStore {
    root: Option<PathBuf>,
    schema: DocumentSchema,
    indexes: RwLock<HashMap<String, Arc<PhysicalIndex>>>,
}

impl TantivyIndexStore {
    /// Store on-disk indexes beneath `root`.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        std::fs::create_dir_all(root).map_err(|e| Error::io_with_path(e, root))?;
        log::info!("Opened index store at {}", root.display());
        Ok(Self {
            root: Some(root.to_path_buf()),
            schema: DocumentSchema::build(),
            indexes: RwLock::new(HashMap::new()),
        })
    }

    /// Store indexes in RAM.
    pub fn in_memory() -> Self {
        Self {
            root: None,
            schema: DocumentSchema::build(),
            indexes: RwLock::new(HashMap::new()),
        }
    }

    /// The stored document with key `id`, decoded from its payload.
    pub fn stored_document(&self, physical: &str, id: ContentId) -> Result<Option<Document>> {
        if !self.contains(physical) {
            return Ok(None);
        }
        let index = self.physical(physical)?;
        let searcher = index.searcher()?;
        let query = TermQuery::new(
            Term::from_field_text(self.schema.doc_key, &id.to_string()),
            IndexRecordOption::Basic,
        );
        let hits = searcher
            .search(&query, &DocSetCollector)
            .map_err(|e| Error::operation(format!("Failed to search {physical}: {e}")))?;

        let Some(address) = hits.into_iter().next() else {
            return Ok(None);
        };
        let doc: TantivyDocument = searcher
            .doc(address)
            .map_err(|e| Error::operation(format!("Failed to load document: {e}")))?;
        match doc.get_first(self.schema.payload).and_then(|v| v.as_str()) {
            Some(payload) => Ok(Some(serde_json::from_str(payload)?)),
            None => Ok(None),
        }
    }

    /// Operations staged on `physical` and not yet committed.
    pub fn staged_operations(&self, physical: &str) -> usize {
        self.indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(physical)
            .map_or(0, |index| index.staged())
    }

    /// Keys of the documents whose key or path contains one of `ids`.
    fn branch_keys(&self, searcher: &Searcher, ids: &[ContentId]) -> Result<Vec<ContentId>> {
        let clauses: Vec<(Occur, Box<dyn Query>)> = ids
            .iter()
            .flat_map(|id| {
                let id = id.to_string();
                [self.schema.path_id, self.schema.doc_key].map(|field| {
                    let query: Box<dyn Query> = Box::new(TermQuery::new(
                        Term::from_field_text(field, &id),
                        IndexRecordOption::Basic,
                    ));
                    (Occur::Should, query)
                })
            })
            .collect();
        let hits = searcher
            .search(&BooleanQuery::new(clauses), &DocSetCollector)
            .map_err(|e| Error::operation(format!("Failed to search branch: {e}")))?;

        let mut keys = Vec::with_capacity(hits.len());
        for address in hits {
            let doc: TantivyDocument = searcher
                .doc(address)
                .map_err(|e| Error::operation(format!("Failed to load document: {e}")))?;
            if let Some(key) = doc.get_first(self.schema.doc_key).and_then(|v| v.as_str()) {
                let key = key
                    .parse::<ContentId>()
                    .map_err(|e| Error::parse(format!("Invalid document key '{key}': {e}")))?;
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn index_dir(&self, physical: &str) -> Option<PathBuf> {
        self.root.as_ref().map(|root| root.join(physical))
    }

    fn physical(&self, physical: &str) -> Result<Arc<PhysicalIndex>> {
        if let Some(index) = self
            .indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(physical)
        {
            return Ok(Arc::clone(index));
        }

        let mut indexes = self.indexes.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(index) = indexes.get(physical) {
            return Ok(Arc::clone(index));
        }
        let index = Arc::new(PhysicalIndex::new(self.open_index(physical)?)?);
        indexes.insert(physical.to_string(), Arc::clone(&index));
        Ok(index)
    }

    fn open_index(&self, physical: &str) -> Result<Index> {
        let Some(dir) = self.index_dir(physical) else {
            return Ok(Index::create_in_ram(self.schema.schema().clone()));
        };

        if dir.join("meta.json").exists() {
            Index::open_in_dir(&dir)
                .map_err(|e| Error::operation(format!("Failed to open index {physical}: {e}")))
        } else {
            std::fs::create_dir_all(&dir).map_err(|e| Error::io_with_path(e, &dir))?;
            log::debug!("Creating physical index {}", dir.display());
            Index::create_in_dir(&dir, self.schema.schema().clone())
                .map_err(|e| Error::operation(format!("Failed to create index {physical}: {e}")))
        }
    }

    fn to_tantivy_doc(&self, document: &Document) -> Result<TantivyDocument> {
        let s = &self.schema;
        let mut doc = TantivyDocument::new();

        doc.add_text(s.doc_key, document.document_key.to_string());
        doc.add_text(s.object_type, document.object_type.as_str());

        let mut path_ids = document.path_ids();
        if !path_ids.contains(&document.document_key) {
            path_ids.push(document.document_key);
        }
        for id in path_ids {
            doc.add_text(s.path_id, id.to_string());
        }

        for variation in &document.variations {
            doc.add_text(
                s.variation,
                format!(
                    "{}|{}",
                    variation.culture.as_deref().unwrap_or_default(),
                    variation.segment.as_deref().unwrap_or_default()
                ),
            );
        }

        if let Some(protection) = &document.protection {
            for key in protection.access_keys() {
                doc.add_text(s.access_key, key.to_string());
            }
        }

        for field in &document.fields {
            for text in field.value.all_text() {
                doc.add_text(s.content, text);
            }
        }

        doc.add_text(s.payload, serde_json::to_string(document)?);
        Ok(doc)
    }
}

impl IndexStore for TantivyIndexStore {
    fn upsert(&self, physical: &str, document: &Document) -> Result<()> {
        let index = self.physical(physical)?;
        let doc = self.to_tantivy_doc(document)?;
        let key = Term::from_field_text(self.schema.doc_key, &document.document_key.to_string());

        index.stage(|writer| {
            writer.delete_term(key);
            writer
                .add_document(doc)
                .map_err(|e| Error::operation(format!("Failed to add document: {e}")))?;
            Ok(())
        })
    }

    fn delete(&self, physical: &str, ids: &[ContentId]) -> Result<Vec<ContentId>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let index = self.physical(physical)?;
        let removed = self.branch_keys(&index.searcher()?, ids)?;
        let path_id = self.schema.path_id;
        let doc_key = self.schema.doc_key;

        index.stage(|writer| {
            for id in ids {
                let id = id.to_string();
                writer.delete_term(Term::from_field_text(path_id, &id));
                writer.delete_term(Term::from_field_text(doc_key, &id));
            }
            Ok(())
        })?;
        Ok(removed)
    }

    fn reset(&self, physical: &str) -> Result<()> {
        let index = self.physical(physical)?;
        index.write_now(|writer| {
            writer
                .delete_all_documents()
                .map_err(|e| Error::operation(format!("Failed to clear index: {e}")))?;
            Ok(())
        })
    }

    fn document_count(&self, physical: &str) -> Result<u64> {
        if !self.contains(physical) {
            return Ok(0);
        }
        Ok(self.physical(physical)?.searcher()?.num_docs())
    }

    fn commit(&self, physical: &str) -> Result<()> {
        let open = self
            .indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(physical)
            .cloned();
        match open {
            Some(index) => index.commit(),
            None => Ok(()),
        }
    }

    fn contains(&self, physical: &str) -> bool {
        if self
            .indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(physical)
        {
            return true;
        }
        self.index_dir(physical)
            .is_some_and(|dir| dir.join("meta.json").exists())
    }

    fn name(&self) -> &str {
        "tantivy"
    }
}

impl std::fmt::Debug for TantivyIndexStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let open: Vec<String> = self
            .indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        f.debug_struct("TantivyIndexStore")
            .field("root", &self.root)
            .field("open", &open)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
