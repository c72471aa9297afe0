//! Field producers.
//!
//! A producer turns one content item into index fields for a set of
//! cultures. Exactly one registered producer supplies the system fields
//! (identifiers, path, name); the others contribute domain fields.

use serde_json::Value;
use vela_core::{ContentItem, FieldValue, IndexField, field_names};

/// Source of index fields for content items.
pub trait FieldProducer: Send + Sync {
    /// Fields of `item` for `cultures` (`None` = culture-invariant).
    ///
    /// `published` selects the published version of property values.
    fn index_fields(
        &self,
        item: &ContentItem,
        cultures: &[Option<String>],
        published: bool,
    ) -> Vec<IndexField>;

    /// Whether this producer supplies the system fields.
    fn is_system(&self) -> bool {
        false
    }

    /// Name used in diagnostics.
    fn name(&self) -> &str;
}

/// Emits the fields every indexed document carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFieldProducer;

impl FieldProducer for SystemFieldProducer {
    fn index_fields(
        &self,
        item: &ContentItem,
        cultures: &[Option<String>],
        published: bool,
    ) -> Vec<IndexField> {
        let mut fields = vec![IndexField::new(
            field_names::ID,
            FieldValue::keyword(item.id.to_string()),
        )];
        if let Some(parent) = item.parent_id() {
            fields.push(IndexField::new(
                field_names::PARENT_ID,
                FieldValue::keyword(parent.to_string()),
            ));
        }
        fields.push(IndexField::new(
            field_names::PATH_IDS,
            FieldValue::keywords(item.path.iter().map(ToString::to_string)),
        ));

        if item.varies_by_culture {
            for culture in cultures.iter().flatten() {
                fields.push(
                    IndexField::new(
                        field_names::NAME,
                        FieldValue::text_r1(item.name_for(Some(culture.as_str()))),
                    )
                    .with_culture(Some(culture.clone())),
                );
            }
        } else {
            fields.push(IndexField::new(
                field_names::NAME,
                FieldValue::text_r1(item.name.clone()),
            ));
        }

        let level = i64::try_from(item.level()).unwrap_or(i64::MAX);
        let is_published = published || item.is_published();
        fields.extend([
            IndexField::new(
                field_names::CONTENT_TYPE,
                FieldValue::keyword(item.content_type.clone()),
            ),
            IndexField::new(
                field_names::OBJECT_TYPE,
                FieldValue::keyword(item.object_type.as_str()),
            ),
            IndexField::new(field_names::LEVEL, FieldValue::integer(level)),
            IndexField::new(field_names::CREATED, FieldValue::date_time(item.created_at)),
            IndexField::new(field_names::UPDATED, FieldValue::date_time(item.updated_at)),
            IndexField::new(
                field_names::PUBLISHED,
                FieldValue::integer(i64::from(is_published)),
            ),
        ]);
        fields
    }

    fn is_system(&self) -> bool {
        true
    }

    fn name(&self) -> &str {
        "system"
    }
}

/// Maps stored property values to fields named after the property alias.
///
/// Strings become texts, integers and booleans integers, other numbers
/// decimals, and arrays of strings keywords. Other JSON values are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyValueFieldProducer;

impl PropertyValueFieldProducer {
    fn field_value(value: &Value) -> Option<FieldValue> {
        let field_value = match value {
            Value::String(s) if !s.is_empty() => FieldValue::text(s.clone()),
            Value::Bool(b) => FieldValue::integer(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FieldValue::integer(i),
                None => FieldValue::decimal(n.as_f64()?),
            },
            Value::Array(values) => {
                FieldValue::keywords(values.iter().filter_map(Value::as_str).map(str::to_string))
            }
            _ => return None,
        };
        (!field_value.is_empty()).then_some(field_value)
    }
}

impl FieldProducer for PropertyValueFieldProducer {
    fn index_fields(
        &self,
        item: &ContentItem,
        cultures: &[Option<String>],
        published: bool,
    ) -> Vec<IndexField> {
        item.properties
            .iter()
            .filter(|property| match &property.culture {
                None => true,
                Some(own) => cultures
                    .iter()
                    .flatten()
                    .any(|c| c.eq_ignore_ascii_case(own)),
            })
            .filter_map(|property| {
                let value = Self::field_value(property.value_for(published)?)?;
                Some(
                    IndexField::new(property.alias.clone(), value)
                        .with_culture(property.culture.clone())
                        .with_segment(property.segment.clone()),
                )
            })
            .collect()
    }

    fn name(&self) -> &str {
        "properties"
    }
}

// ============================================================================
// Tests
// ============================================================================
