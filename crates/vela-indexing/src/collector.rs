//! Field collection across registered producers.
//!
//! The system producer always runs first, then the others in registration
//! order. A field whose `(name, culture, segment)` was already produced is
//! dropped with a warning: the first writer wins.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use vela_core::{ContentItem, Error, FieldKey, IndexField, Result};

use crate::producers::FieldProducer;

/// A field dropped because an earlier producer emitted the same key.
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateField {
    /// Producer whose field was dropped.
    pub producer: String,
    /// The dropped field.
    pub field: IndexField,
}

/// Result of one collection, including dropped duplicates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectReport {
    /// Merged fields.
    pub fields: Vec<IndexField>,
    /// Fields dropped as duplicates.
    pub duplicates: Vec<DuplicateField>,
}

/// Runs every registered producer for one item and merges their output.
#[derive(Clone)]
pub struct FieldCollector {
    system: Arc<dyn FieldProducer>,
    others: Vec<Arc<dyn FieldProducer>>,
}

impl FieldCollector {
    /// Create a collector.
    ///
    /// Exactly one producer must report [`FieldProducer::is_system`];
    /// otherwise this is a configuration error.
    pub fn new(producers: Vec<Arc<dyn FieldProducer>>) -> Result<Self> {
        let (mut system, others): (Vec<_>, Vec<_>) =
            producers.into_iter().partition(|p| p.is_system());

        match system.len() {
            1 => {}
            0 => return Err(Error::config("no system field producer registered")),
            n => {
                return Err(Error::config(format!(
                    "{n} system field producers registered, expected exactly one"
                )));
            }
        }
        let Some(system) = system.pop() else {
            return Err(Error::config("no system field producer registered"));
        };

        Ok(Self { system, others })
    }

    /// Cultures to collect for.
    ///
    /// Available cultures for drafts, published cultures otherwise, or a
    /// single `None` for culture-invariant items. `None` when the set is
    /// empty.
    pub fn cultures(item: &ContentItem, published: bool) -> Option<Vec<Option<String>>> {
        if !item.varies_by_culture {
            return Some(vec![None]);
        }
        let source = if published {
            &item.published_cultures
        } else {
            &item.available_cultures
        };
        if source.is_empty() {
            return None;
        }
        Some(source.iter().cloned().map(Some).collect())
    }

    /// Collect fields for `item`; `None` means there is nothing to index.
    pub fn collect(&self, item: &ContentItem, published: bool) -> Option<Vec<IndexField>> {
        self.collect_report(item, published).map(|report| report.fields)
    }

    /// Collect fields and report the duplicates that were dropped.
    pub fn collect_report(&self, item: &ContentItem, published: bool) -> Option<CollectReport> {
        let cultures = Self::cultures(item, published)?;

        let mut seen: HashSet<FieldKey> = HashSet::new();
        let mut report = CollectReport::default();
        for producer in std::iter::once(&self.system).chain(&self.others) {
            for field in producer.index_fields(item, &cultures, published) {
                if seen.insert(field.key()) {
                    report.fields.push(field);
                } else {
                    log::warn!(
                        "Producer '{}' emitted duplicate field '{}' (culture {:?}, segment {:?}) for {}; keeping the first value",
                        producer.name(),
                        field.field_name,
                        field.culture,
                        field.segment,
                        item.id
                    );
                    report.duplicates.push(DuplicateField {
                        producer: producer.name().to_string(),
                        field,
                    });
                }
            }
        }
        Some(report)
    }

    /// Number of registered producers, including the system producer.
    pub fn producer_count(&self) -> usize {
        1 + self.others.len()
    }
}

impl fmt::Debug for FieldCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let others: Vec<&str> = self.others.iter().map(|p| p.name()).collect();
        f.debug_struct("FieldCollector")
            .field("system", &self.system.name())
            .field("others", &others)
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
