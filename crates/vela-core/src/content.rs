//! Content model consumed from the content repository.
//!
//! A [`ContentItem`] is a snapshot of one node in the content tree: its
//! position (path of ancestor ids), its variation settings, which cultures are
//! available and published, and its property values.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Error;

/// Identifier of a content item (document key).
pub type ContentId = Uuid;

/// Kind of repository object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectType {
    /// Routable content (documents).
    Content,
    /// Media items.
    Media,
    /// Members.
    Member,
}

impl ObjectType {
    /// All object types, in declaration order.
    pub const ALL: [ObjectType; 3] = [ObjectType::Content, ObjectType::Media, ObjectType::Member];

    /// Stable lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Content => "content",
            ObjectType::Media => "media",
            ObjectType::Member => "member",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" | "document" => Ok(ObjectType::Content),
            "media" => Ok(ObjectType::Media),
            "member" => Ok(ObjectType::Member),
            other => Err(Error::parse(format!("unknown object type '{other}'"))),
        }
    }
}

/// One stored property value of a content item.
///
/// `value` is the current (draft) value; `published_value` is the value of the
/// published version, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyValue {
    /// Property alias (becomes the index field name).
    pub alias: String,
    /// Culture of the value, `None` for culture-invariant properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
    /// Segment of the value, `None` for the default segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
    /// Draft value.
    #[serde(default)]
    pub value: serde_json::Value,
    /// Published value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_value: Option<serde_json::Value>,
}

impl PropertyValue {
    /// Create an invariant property value that is both draft and published.
    pub fn invariant(alias: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            alias: alias.into(),
            culture: None,
            segment: None,
            published_value: Some(value.clone()),
            value,
        }
    }

    /// Restrict the value to a culture.
    pub fn with_culture(mut self, culture: impl Into<String>) -> Self {
        self.culture = Some(culture.into());
        self
    }

    /// Restrict the value to a segment.
    pub fn with_segment(mut self, segment: impl Into<String>) -> Self {
        self.segment = Some(segment.into());
        self
    }

    /// Mark the value as draft-only (no published version).
    pub fn unpublished(mut self) -> Self {
        self.published_value = None;
        self
    }

    /// The value for the requested version, if present.
    pub fn value_for(&self, published: bool) -> Option<&serde_json::Value> {
        if published {
            self.published_value.as_ref()
        } else {
            Some(&self.value)
        }
    }

    /// Whether this value applies to `culture` (culture-specific match or
    /// culture-invariant value).
    pub fn applies_to(&self, culture: Option<&str>) -> bool {
        match (&self.culture, culture) {
            (None, _) => true,
            (Some(own), Some(requested)) => own.eq_ignore_ascii_case(requested),
            (Some(_), None) => false,
        }
    }
}

/// Snapshot of one item in the content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Item key.
    pub id: ContentId,
    /// Repository object type.
    pub object_type: ObjectType,
    /// Ids from the root down to and including this item.
    pub path: Vec<ContentId>,
    /// Position among siblings.
    #[serde(default)]
    pub sort_order: i32,
    /// Invariant name.
    pub name: String,
    /// Per-culture names for culture-variant items.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub culture_names: BTreeMap<String, String>,
    /// Content type alias.
    pub content_type: String,
    /// Whether the item varies by culture.
    #[serde(default)]
    pub varies_by_culture: bool,
    /// Whether the item has segment-variant properties.
    #[serde(default)]
    pub varies_by_segment: bool,
    /// Cultures with a draft version (culture-variant items only).
    #[serde(default)]
    pub available_cultures: Vec<String>,
    /// Cultures with a published version (culture-variant items only).
    #[serde(default)]
    pub published_cultures: Vec<String>,
    /// Published flag of culture-invariant items.
    #[serde(default)]
    pub published: bool,
    /// Whether the item sits in the recycle bin.
    #[serde(default)]
    pub trashed: bool,
    /// Stored property values.
    #[serde(default)]
    pub properties: Vec<PropertyValue>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    /// Create a culture-invariant, published item at the root of the tree.
    pub fn new(id: ContentId, object_type: ObjectType, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            object_type,
            path: vec![id],
            sort_order: 0,
            name: name.into(),
            culture_names: BTreeMap::new(),
            content_type: object_type.as_str().to_string(),
            varies_by_culture: false,
            varies_by_segment: false,
            available_cultures: Vec::new(),
            published_cultures: Vec::new(),
            published: true,
            trashed: false,
            properties: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Place the item beneath `parent`.
    pub fn under(mut self, parent: &ContentItem) -> Self {
        let mut path = parent.path.clone();
        path.push(self.id);
        self.path = path;
        self
    }

    /// Make the item culture-variant with the given available and published
    /// cultures.
    pub fn with_cultures(mut self, available: &[&str], published: &[&str]) -> Self {
        self.varies_by_culture = true;
        self.available_cultures = available.iter().map(|c| c.to_string()).collect();
        self.published_cultures = published.iter().map(|c| c.to_string()).collect();
        self.published = !self.published_cultures.is_empty();
        self
    }

    /// Set the published flag of a culture-invariant item.
    pub fn with_published(mut self, published: bool) -> Self {
        self.published = published;
        self
    }

    /// Add a property value.
    pub fn with_property(mut self, value: PropertyValue) -> Self {
        if value.segment.is_some() {
            self.varies_by_segment = true;
        }
        self.properties.push(value);
        self
    }

    /// Set the content type alias.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// Parent id, `None` for root items.
    pub fn parent_id(&self) -> Option<ContentId> {
        self.ancestor_ids().last().copied()
    }

    /// Ancestor ids from the root down to (excluding) this item.
    pub fn ancestor_ids(&self) -> &[ContentId] {
        match self.path.split_last() {
            Some((_, ancestors)) => ancestors,
            None => &[],
        }
    }

    /// Depth in the tree; root items have level 1.
    pub fn level(&self) -> usize {
        self.path.len().max(1)
    }

    /// Whether any version of the item is published.
    pub fn is_published(&self) -> bool {
        if self.trashed {
            return false;
        }
        if self.varies_by_culture {
            !self.published_cultures.is_empty()
        } else {
            self.published
        }
    }

    /// Whether `culture` is published on this item.
    pub fn is_culture_published(&self, culture: &str) -> bool {
        self.published_cultures
            .iter()
            .any(|c| c.eq_ignore_ascii_case(culture))
    }

    /// Name to index for a culture, falling back to the invariant name.
    pub fn name_for(&self, culture: Option<&str>) -> &str {
        culture
            .and_then(|c| self.culture_names.get(c))
            .map(String::as_str)
            .unwrap_or(&self.name)
    }
}

// ============================================================================
// Tests
// ============================================================================
