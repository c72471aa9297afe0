//! Indexable values and the document handed to indexers and the cache.
//!
//! A [`Document`] carries the variations of one content item together with
//! the fields computed for them. Its constructor enforces that every field is
//! covered by at least one variation, so no orphaned culture/segment values
//! ever reach an index.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{ContentId, ObjectType};

/// Names of the fields emitted by the system field producer.
pub mod field_names {
    /// Item key.
    pub const ID: &str = "id";
    /// Parent key (absent for root items).
    pub const PARENT_ID: &str = "parent_id";
    /// Keys from the root down to and including the item.
    pub const PATH_IDS: &str = "path_ids";
    /// Item name (per culture for culture-variant items).
    pub const NAME: &str = "name";
    /// Content type alias.
    pub const CONTENT_TYPE: &str = "content_type";
    /// Repository object type.
    pub const OBJECT_TYPE: &str = "object_type";
    /// Depth in the tree.
    pub const LEVEL: &str = "level";
    /// Creation timestamp.
    pub const CREATED: &str = "created";
    /// Last update timestamp.
    pub const UPDATED: &str = "updated";
    /// 1 when the indexed version is published, 0 otherwise.
    pub const PUBLISHED: &str = "published";
}

/// One (culture, segment) slice of a content item.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variation {
    /// Culture, `None` for culture-invariant content.
    pub culture: Option<String>,
    /// Segment, `None` for the default segment.
    pub segment: Option<String>,
}

impl Variation {
    /// Create a variation.
    pub fn new(culture: Option<String>, segment: Option<String>) -> Self {
        Self { culture, segment }
    }

    /// The single variation of invariant, unsegmented content.
    pub fn invariant() -> Self {
        Self::new(None, None)
    }

    /// Variation for a culture with the default segment.
    pub fn culture(culture: impl Into<String>) -> Self {
        Self::new(Some(culture.into()), None)
    }

    /// Whether a field with the given culture and segment belongs to this
    /// variation. `None` on the field side matches any variation.
    pub fn covers(&self, culture: Option<&str>, segment: Option<&str>) -> bool {
        let culture_ok = match culture {
            None => true,
            Some(c) => self
                .culture
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(c)),
        };
        let segment_ok = match segment {
            None => true,
            Some(s) => self.segment.as_deref() == Some(s),
        };
        culture_ok && segment_ok
    }
}

/// Typed container of indexable values.
///
/// Text values come in four relevance tiers: `texts_r1` is the most relevant,
/// `texts` the least.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Exact-match keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// Full text, default relevance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texts: Vec<String>,
    /// Full text, highest relevance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texts_r1: Vec<String>,
    /// Full text, second relevance tier.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texts_r2: Vec<String>,
    /// Full text, third relevance tier.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texts_r3: Vec<String>,
    /// Integers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub integers: Vec<i64>,
    /// Decimals.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decimals: Vec<f64>,
    /// UTC timestamps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub date_times: Vec<DateTime<Utc>>,
}

impl FieldValue {
    /// Keyword values.
    pub fn keywords<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: values.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// A single keyword.
    pub fn keyword(value: impl Into<String>) -> Self {
        Self::keywords([value.into()])
    }

    /// A single default-relevance text.
    pub fn text(value: impl Into<String>) -> Self {
        Self {
            texts: vec![value.into()],
            ..Default::default()
        }
    }

    /// A single top-relevance text.
    pub fn text_r1(value: impl Into<String>) -> Self {
        Self {
            texts_r1: vec![value.into()],
            ..Default::default()
        }
    }

    /// A single integer.
    pub fn integer(value: i64) -> Self {
        Self {
            integers: vec![value],
            ..Default::default()
        }
    }

    /// A single decimal.
    pub fn decimal(value: f64) -> Self {
        Self {
            decimals: vec![value],
            ..Default::default()
        }
    }

    /// A single timestamp.
    pub fn date_time(value: DateTime<Utc>) -> Self {
        Self {
            date_times: vec![value],
            ..Default::default()
        }
    }

    /// Whether the container holds no values.
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
            && self.texts.is_empty()
            && self.texts_r1.is_empty()
            && self.texts_r2.is_empty()
            && self.texts_r3.is_empty()
            && self.integers.is_empty()
            && self.decimals.is_empty()
            && self.date_times.is_empty()
    }

    /// All textual values (texts of every tier and keywords), most relevant
    /// first.
    pub fn all_text(&self) -> impl Iterator<Item = &str> {
        self.texts_r1
            .iter()
            .chain(&self.texts_r2)
            .chain(&self.texts_r3)
            .chain(&self.texts)
            .chain(&self.keywords)
            .map(String::as_str)
    }
}

/// A named value for one culture and segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexField {
    /// Field name.
    pub field_name: String,
    /// Values.
    pub value: FieldValue,
    /// Culture, `None` for invariant values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub culture: Option<String>,
    /// Segment, `None` for the default segment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment: Option<String>,
}

impl IndexField {
    /// Create an invariant field.
    pub fn new(field_name: impl Into<String>, value: FieldValue) -> Self {
        Self {
            field_name: field_name.into(),
            value,
            culture: None,
            segment: None,
        }
    }

    /// Restrict the field to a culture.
    pub fn with_culture(mut self, culture: Option<String>) -> Self {
        self.culture = culture;
        self
    }

    /// Restrict the field to a segment.
    pub fn with_segment(mut self, segment: Option<String>) -> Self {
        self.segment = segment;
        self
    }

    /// Merge identity: `(field_name, culture, segment)`.
    pub fn key(&self) -> FieldKey {
        FieldKey {
            field_name: self.field_name.clone(),
            culture: self.culture.as_ref().map(|c| c.to_ascii_lowercase()),
            segment: self.segment.clone(),
        }
    }
}

/// Identity of a field for merge and deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey {
    /// Field name.
    pub field_name: String,
    /// Lowercased culture.
    pub culture: Option<String>,
    /// Segment.
    pub segment: Option<String>,
}

/// Access keys gating visibility of a document. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentProtection {
    access_keys: Vec<Uuid>,
}

impl ContentProtection {
    /// Build a protection from access keys; `None` when no keys remain.
    ///
    /// Keys are sorted and deduplicated.
    pub fn from_keys<I: IntoIterator<Item = Uuid>>(keys: I) -> Option<Self> {
        let mut access_keys: Vec<Uuid> = keys.into_iter().collect();
        access_keys.sort();
        access_keys.dedup();
        if access_keys.is_empty() {
            None
        } else {
            Some(Self { access_keys })
        }
    }

    /// The access keys.
    pub fn access_keys(&self) -> &[Uuid] {
        &self.access_keys
    }
}

/// Unit handed to indexers and persisted in the document cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Item key.
    pub document_key: ContentId,
    /// Repository object type.
    pub object_type: ObjectType,
    /// Indexable variations.
    pub variations: Vec<Variation>,
    /// Fields, each covered by a variation.
    pub fields: Vec<IndexField>,
    /// Access restriction; `None` means publicly visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protection: Option<ContentProtection>,
}

impl Document {
    /// Create a document, dropping fields not covered by any variation.
    pub fn new(
        document_key: ContentId,
        object_type: ObjectType,
        variations: Vec<Variation>,
        fields: Vec<IndexField>,
        protection: Option<ContentProtection>,
    ) -> Self {
        let mut document = Self {
            document_key,
            object_type,
            variations,
            fields,
            protection,
        };
        document.retain_covered_fields();
        document
    }

    /// Replace the variations and drop fields that no longer fit them.
    pub fn restrict_to(&mut self, variations: Vec<Variation>) {
        self.variations = variations;
        self.retain_covered_fields();
    }

    /// Look up a field by identity.
    pub fn field(
        &self,
        field_name: &str,
        culture: Option<&str>,
        segment: Option<&str>,
    ) -> Option<&IndexField> {
        self.fields.iter().find(|f| {
            f.field_name == field_name
                && match (f.culture.as_deref(), culture) {
                    (None, None) => true,
                    (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
                    _ => false,
                }
                && f.segment.as_deref() == segment
        })
    }

    /// Keys of the item and all its ancestors, read from the system
    /// `path_ids` field.
    pub fn path_ids(&self) -> Vec<ContentId> {
        self.field(field_names::PATH_IDS, None, None)
            .map(|f| {
                f.value
                    .keywords
                    .iter()
                    .filter_map(|k| Uuid::parse_str(k).ok())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn retain_covered_fields(&mut self) {
        let variations = &self.variations;
        self.fields.retain(|field| {
            variations
                .iter()
                .any(|v| v.covers(field.culture.as_deref(), field.segment.as_deref()))
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
