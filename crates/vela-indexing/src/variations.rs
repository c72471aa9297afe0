//! Variation computation.
//!
//! Draft documents carry every available culture. Published documents carry
//! only the routable published variations: cultures published on the item
//! and on every ancestor.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use vela_core::{ContentId, ContentItem, ContentRepository, Result, Variation};

/// Per-dispatch memo of repository lookups used while walking ancestors.
pub struct AncestorCache {
    repository: Arc<dyn ContentRepository>,
    items: HashMap<ContentId, Option<Arc<ContentItem>>>,
}

impl AncestorCache {
    /// Create an empty cache.
    pub fn new(repository: Arc<dyn ContentRepository>) -> Self {
        Self {
            repository,
            items: HashMap::new(),
        }
    }

    /// Look up an item, hitting the repository at most once per id.
    pub async fn get(&mut self, id: ContentId) -> Result<Option<Arc<ContentItem>>> {
        if let Some(item) = self.items.get(&id) {
            return Ok(item.clone());
        }
        let item = self.repository.get_by_id(id).await?.map(Arc::new);
        self.items.insert(id, item.clone());
        Ok(item)
    }

    /// Record an item already fetched by the caller.
    pub fn insert(&mut self, item: &ContentItem) {
        self.items.insert(item.id, Some(Arc::new(item.clone())));
    }

    /// Number of memoized lookups.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing has been looked up yet.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Variations of the draft version: every available culture (or the
/// invariant culture), expanded by segment.
pub fn draft_variations(item: &ContentItem) -> Vec<Variation> {
    let cultures: Vec<Option<String>> = if item.varies_by_culture {
        item.available_cultures.iter().cloned().map(Some).collect()
    } else {
        vec![None]
    };
    expand_segments(item, &cultures, false)
}

/// Variations of the published version that are routable: published on the
/// item and on every ancestor.
///
/// An unpublished or missing ancestor leaves nothing routable. When both the
/// item and an ancestor vary by culture, only cultures published on both
/// survive.
pub async fn routable_published_variations(
    item: &ContentItem,
    ancestors: &mut AncestorCache,
) -> Result<Vec<Variation>> {
    if !item.is_published() {
        return Ok(Vec::new());
    }

    let mut cultures: Vec<Option<String>> = if item.varies_by_culture {
        item.published_cultures.iter().cloned().map(Some).collect()
    } else {
        vec![None]
    };

    for ancestor_id in item.ancestor_ids().iter().rev() {
        let Some(ancestor) = ancestors.get(*ancestor_id).await? else {
            log::debug!("Ancestor {ancestor_id} of {} is missing", item.id);
            return Ok(Vec::new());
        };
        if !ancestor.is_published() {
            return Ok(Vec::new());
        }
        if item.varies_by_culture && ancestor.varies_by_culture {
            cultures.retain(|culture| {
                culture
                    .as_deref()
                    .is_some_and(|c| ancestor.is_culture_published(c))
            });
        }
        if cultures.is_empty() {
            return Ok(Vec::new());
        }
    }

    Ok(expand_segments(item, &cultures, true))
}

/// Expand cultures into `(culture, segment)` variations.
///
/// Items without segment-variant properties get one variation per culture.
/// Otherwise each culture yields the `None` segment (when any applicable
/// value is unsegmented, or no value applies) plus one variation per
/// distinct segment seen on that culture's values.
pub fn expand_segments(
    item: &ContentItem,
    cultures: &[Option<String>],
    published: bool,
) -> Vec<Variation> {
    let mut variations = Vec::new();
    for culture in cultures {
        if !item.varies_by_segment {
            variations.push(Variation::new(culture.clone(), None));
            continue;
        }

        let mut has_default = false;
        let mut segments = BTreeSet::new();
        for value in item
            .properties
            .iter()
            .filter(|v| v.applies_to(culture.as_deref()))
            .filter(|v| v.value_for(published).is_some())
        {
            match &value.segment {
                Some(segment) => {
                    segments.insert(segment.clone());
                }
                None => has_default = true,
            }
        }

        if has_default || segments.is_empty() {
            variations.push(Variation::new(culture.clone(), None));
        }
        variations.extend(
            segments
                .into_iter()
                .map(|segment| Variation::new(culture.clone(), Some(segment))),
        );
    }
    variations
}

// ============================================================================
// Tests
// ============================================================================
