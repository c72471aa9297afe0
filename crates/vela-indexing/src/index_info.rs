//! Registration of one logical index.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use vela_core::ObjectType;
use vela_fts::Indexer;

/// Binds a logical index alias to the object types it accepts and the
/// indexer that writes it. Immutable after startup.
#[derive(Clone)]
pub struct IndexInfo {
    /// Logical alias.
    pub alias: String,
    /// Object types routed to this index.
    pub contained_object_types: BTreeSet<ObjectType>,
    /// Write boundary to the physical index.
    pub indexer: Arc<dyn Indexer>,
}

impl IndexInfo {
    /// Create a registration.
    pub fn new(
        alias: impl Into<String>,
        object_types: impl IntoIterator<Item = ObjectType>,
        indexer: Arc<dyn Indexer>,
    ) -> Self {
        Self {
            alias: alias.into(),
            contained_object_types: object_types.into_iter().collect(),
            indexer,
        }
    }

    /// Whether items of `object_type` belong in this index.
    pub fn accepts(&self, object_type: ObjectType) -> bool {
        self.contained_object_types.contains(&object_type)
    }
}

impl fmt::Debug for IndexInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexInfo")
            .field("alias", &self.alias)
            .field("contained_object_types", &self.contained_object_types)
            .field("indexer", &self.indexer.name())
            .finish()
    }
}
