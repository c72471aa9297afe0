//! Per-index write vetoes.
//!
//! A policy may skip one document for one index without affecting the
//! other indexes the document is written to.

use serde::{Deserialize, Serialize};
use vela_core::Document;

use crate::index_info::IndexInfo;

/// Decision of an [`IndexingPolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    /// Write the document.
    Index,
    /// Skip this index for this document.
    Skip,
}

/// Outcome of writing one document to one index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    /// Written to the index and the document cache.
    Written,
    /// Vetoed by a policy; neither index nor cache were touched.
    SkippedByPolicy,
}

/// Veto hook consulted before each index write.
pub trait IndexingPolicy: Send + Sync {
    /// Decide whether `document` goes into `index`.
    fn decide(&self, index: &IndexInfo, document: &Document) -> PolicyDecision;
}

impl<F> IndexingPolicy for F
where
    F: Fn(&IndexInfo, &Document) -> PolicyDecision + Send + Sync,
{
    fn decide(&self, index: &IndexInfo, document: &Document) -> PolicyDecision {
        self(index, document)
    }
}
