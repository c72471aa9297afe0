//! In-memory physical index store.

use std::collections::{BTreeMap, HashMap};
use std::sync::{PoisonError, RwLock};

use vela_core::{ContentId, Document, Result};

use crate::store::IndexStore;

type PhysicalIndex = BTreeMap<ContentId, Document>;

/// Index store keeping documents in process-local maps.
#[derive(Debug, Default)]
pub struct MemoryIndexStore {
    indexes: RwLock<HashMap<String, PhysicalIndex>>,
}

impl MemoryIndexStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A stored document.
    pub fn get(&self, physical: &str, id: ContentId) -> Option<Document> {
        self.indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(physical)
            .and_then(|index| index.get(&id))
            .cloned()
    }

    /// All documents of a physical index, ordered by key.
    pub fn documents(&self, physical: &str) -> Vec<Document> {
        self.indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(physical)
            .map(|index| index.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Names of the physical indexes created so far.
    pub fn physical_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

impl IndexStore for MemoryIndexStore {
    fn upsert(&self, physical: &str, document: &Document) -> Result<()> {
        self.indexes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(physical.to_string())
            .or_default()
            .insert(document.document_key, document.clone());
        Ok(())
    }

    fn delete(&self, physical: &str, ids: &[ContentId]) -> Result<Vec<ContentId>> {
        let mut indexes = self.indexes.write().unwrap_or_else(PoisonError::into_inner);
        let index = indexes.entry(physical.to_string()).or_default();
        let mut removed = Vec::new();
        index.retain(|key, document| {
            let hit = ids.contains(key) || document.path_ids().iter().any(|p| ids.contains(p));
            if hit {
                removed.push(*key);
            }
            !hit
        });
        Ok(removed)
    }

    fn reset(&self, physical: &str) -> Result<()> {
        self.indexes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(physical.to_string(), PhysicalIndex::new());
        Ok(())
    }

    fn document_count(&self, physical: &str) -> Result<u64> {
        Ok(self
            .indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(physical)
            .map_or(0, |index| index.len() as u64))
    }

    fn contains(&self, physical: &str) -> bool {
        self.indexes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(physical)
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use uuid::Uuid;
    use vela_core::{FieldValue, IndexField, ObjectType, Variation, field_names};

    fn doc(path: &[ContentId]) -> Document {
        let id = *path.last().unwrap();
        Document::new(
            id,
            ObjectType::Content,
            vec![Variation::invariant()],
            vec![IndexField::new(
                field_names::PATH_IDS,
                FieldValue::keywords(path.iter().map(ToString::to_string)),
            )],
            None,
        )
    }

    #[test]
    fn test_upsert_and_count() {
        let store = MemoryIndexStore::new();
        let id = Uuid::new_v4();
        assert!(!store.contains("site-a"));

        store.upsert("site-a", &doc(&[id])).unwrap();
        store.upsert("site-a", &doc(&[id])).unwrap();
        assert!(store.contains("site-a"));
        assert_eq!(store.document_count("site-a").unwrap(), 1);
        assert_eq!(store.document_count("site-b").unwrap(), 0);
    }

    #[test]
    fn test_delete_removes_descendants() {
        let store = MemoryIndexStore::new();
        let root = Uuid::new_v4();
        let child = Uuid::new_v4();
        let grandchild = Uuid::new_v4();
        let sibling = Uuid::new_v4();
        store.upsert("site-a", &doc(&[root])).unwrap();
        store.upsert("site-a", &doc(&[root, child])).unwrap();
        store.upsert("site-a", &doc(&[root, child, grandchild])).unwrap();
        store.upsert("site-a", &doc(&[root, sibling])).unwrap();

        let mut removed = store.delete("site-a", &[child]).unwrap();
        removed.sort();
        let mut expected = vec![child, grandchild];
        expected.sort();
        assert_eq!(removed, expected);

        assert!(store.get("site-a", child).is_none());
        assert!(store.get("site-a", grandchild).is_none());
        assert!(store.get("site-a", root).is_some());
        assert!(store.get("site-a", sibling).is_some());
    }

    #[test]
    fn test_reset_creates_empty_index() {
        let store = MemoryIndexStore::new();
        store.upsert("site-b", &doc(&[Uuid::new_v4()])).unwrap();
        store.reset("site-b").unwrap();
        store.reset("site-a").unwrap();

        assert_eq!(store.document_count("site-b").unwrap(), 0);
        assert_eq!(store.physical_names(), vec!["site-a", "site-b"]);
    }
}
