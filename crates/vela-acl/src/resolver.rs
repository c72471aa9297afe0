//! Protection resolution for content items.
//!
//! Public-access entries are attached to individual nodes of the content
//! tree. An item is protected by the nearest entry found on its
//! ancestor-or-self path; the entry's rules are translated into access keys
//! through an [`AccessKeyDirectory`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use vela_core::{ContentId, ContentItem, ContentProtection, ObjectType};

use crate::directory::AccessKeyDirectory;

/// Computes the protection of a content item.
///
/// Implementations must be pure functions of their configuration and the
/// item's path.
pub trait ProtectionResolver: Send + Sync {
    /// Protection for `item`, `None` when it is publicly visible.
    fn resolve(&self, item: &ContentItem) -> Option<ContentProtection>;
}

/// A principal granted access by a public-access entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum AccessRule {
    /// Members of a role.
    MemberRole(String),
    /// A single member, by login.
    Member(String),
}

/// Restriction attached to one node of the content tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicAccessEntry {
    /// Principals allowed to see the node and its descendants.
    pub rules: Vec<AccessRule>,
}

impl PublicAccessEntry {
    /// Create an entry from rules.
    pub fn new(rules: Vec<AccessRule>) -> Self {
        Self { rules }
    }
}

/// Resolver that never protects anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProtection;

impl ProtectionResolver for NoProtection {
    fn resolve(&self, _item: &ContentItem) -> Option<ContentProtection> {
        None
    }
}

/// Resolver backed by public-access entries.
pub struct PublicAccessResolver {
    entries: HashMap<ContentId, PublicAccessEntry>,
    directory: Arc<dyn AccessKeyDirectory>,
}

impl PublicAccessResolver {
    /// Create a resolver without entries.
    pub fn new(directory: Arc<dyn AccessKeyDirectory>) -> Self {
        Self {
            entries: HashMap::new(),
            directory,
        }
    }

    /// Protect `node` and its descendants.
    pub fn with_entry(mut self, node: ContentId, entry: PublicAccessEntry) -> Self {
        self.entries.insert(node, entry);
        self
    }

    /// Number of configured entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    fn nearest_entry(&self, item: &ContentItem) -> Option<&PublicAccessEntry> {
        item.path
            .iter()
            .rev()
            .find_map(|node| self.entries.get(node))
    }

    fn access_key(&self, rule: &AccessRule) -> Option<uuid::Uuid> {
        let key = match rule {
            AccessRule::MemberRole(role) => self.directory.role_key(role),
            AccessRule::Member(login) => self.directory.member_key(login),
        };
        if key.is_none() {
            log::debug!("No access key for rule {rule:?}");
        }
        key
    }
}

impl ProtectionResolver for PublicAccessResolver {
    fn resolve(&self, item: &ContentItem) -> Option<ContentProtection> {
        if item.object_type != ObjectType::Content {
            return None;
        }
        let entry = self.nearest_entry(item)?;
        ContentProtection::from_keys(entry.rules.iter().filter_map(|r| self.access_key(r)))
    }
}

impl fmt::Debug for PublicAccessResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicAccessResolver")
            .field("entries", &self.entries.len())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
