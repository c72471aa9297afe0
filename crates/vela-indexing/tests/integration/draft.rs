//! Draft strategy behaviour.

use std::sync::Arc;

use serde_json::json;
use vela_core::{
    ChangeType, ContentChange, ContentItem, FieldValue, IndexField, IndexingConfig, ObjectType,
    PropertyValue, field_names,
};
use vela_indexing::FieldProducer;
use vela_storage::DocumentCache;

use crate::common::{DRAFT, PUBLISHED, TestHarness, page, sorted_ids};

#[tokio::test]
async fn test_unpublished_item_is_indexed_in_draft_only() {
    let harness = TestHarness::new().await;
    let item = page("Work in progress").with_published(false);
    harness.add(&[&item]);

    harness
        .handle(vec![
            ContentChange::draft(item.id, ChangeType::Refresh),
            ContentChange::published(item.id, ChangeType::Refresh),
        ])
        .await;

    assert!(harness.document(DRAFT, item.id).is_some());
    assert!(harness.document(PUBLISHED, item.id).is_none());
}

#[tokio::test]
async fn test_remove_then_refresh_keeps_item() {
    let harness = TestHarness::new().await;
    let item = page("Home");
    harness.add(&[&item]);

    harness
        .handle(vec![
            ContentChange::draft(item.id, ChangeType::Remove),
            ContentChange::draft(item.id, ChangeType::Refresh),
        ])
        .await;

    assert!(harness.document(DRAFT, item.id).is_some());
}

#[tokio::test]
async fn test_refresh_then_remove_drops_item() {
    let harness = TestHarness::new().await;
    let item = page("Home");
    harness.add(&[&item]);

    let stats = harness
        .orchestrator
        .dispatch(&[
            ContentChange::draft(item.id, ChangeType::Refresh),
            ContentChange::draft(item.id, ChangeType::Remove),
        ])
        .await
        .unwrap();

    assert_eq!(stats.indexed, 1);
    assert_eq!(stats.removed, 1);
    assert!(harness.document(DRAFT, item.id).is_none());
    assert!(harness.cache.get(item.id, DRAFT).await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_item_is_removed() {
    let harness = TestHarness::new().await;
    let item = page("Temporary");
    harness.add(&[&item]);
    harness
        .handle(vec![ContentChange::draft(item.id, ChangeType::Refresh)])
        .await;
    assert!(harness.cache.get(item.id, DRAFT).await.unwrap().is_some());

    harness.repository.remove(item.id);
    harness
        .handle(vec![ContentChange::draft(item.id, ChangeType::Refresh)])
        .await;

    assert!(harness.document(DRAFT, item.id).is_none());
    assert!(harness.cache.get(item.id, DRAFT).await.unwrap().is_none());
}

#[tokio::test]
async fn test_removed_branch_clears_descendant_cache() {
    let harness = TestHarness::new().await;
    let root = page("Home");
    let child = page("About").under(&root);
    harness.add(&[&root, &child]);
    harness
        .handle(vec![ContentChange::draft(root.id, ChangeType::RefreshBranch)])
        .await;
    assert!(harness.cache.get(child.id, DRAFT).await.unwrap().is_some());

    harness.repository.remove(root.id);
    harness.repository.remove(child.id);
    harness
        .handle(vec![ContentChange::draft(root.id, ChangeType::Remove)])
        .await;

    assert!(harness.document(DRAFT, child.id).is_none());
    assert!(harness.cache.get(root.id, DRAFT).await.unwrap().is_none());
    assert!(harness.cache.get(child.id, DRAFT).await.unwrap().is_none());
}

#[tokio::test]
async fn test_publish_state_changes_are_ignored() {
    let harness = TestHarness::new().await;
    let item = page("Home");
    harness.add(&[&item]);

    let stats = harness
        .orchestrator
        .dispatch(&[ContentChange::draft(item.id, ChangeType::Refresh).affecting_publish_state()])
        .await
        .unwrap();

    assert_eq!(stats.indexed, 0);
    assert!(harness.document(DRAFT, item.id).is_none());
}

#[tokio::test]
async fn test_branch_refresh_includes_trashed_descendants() {
    let harness = TestHarness::new().await;
    let root = page("Home");
    let child = page("About").under(&root);
    let mut binned = page("Old").under(&child);
    binned.trashed = true;
    harness.add(&[&root, &child, &binned]);

    harness
        .handle(vec![ContentChange::draft(root.id, ChangeType::RefreshBranch)])
        .await;

    assert_eq!(harness.ids(DRAFT), sorted_ids(&[&root, &child, &binned]));
}

#[tokio::test]
async fn test_draft_uses_all_available_cultures() {
    let harness = TestHarness::new().await;
    let item = page("Home")
        .with_cultures(&["en", "da"], &[])
        .with_property(PropertyValue::invariant("title", json!("Welcome")).with_culture("en"))
        .with_property(
            PropertyValue::invariant("title", json!("Velkommen"))
                .with_culture("da")
                .unpublished(),
        );
    harness.add(&[&item]);

    harness
        .handle(vec![ContentChange::draft(item.id, ChangeType::Refresh)])
        .await;

    let doc = harness.document(DRAFT, item.id).unwrap();
    assert_eq!(doc.variations.len(), 2);
    assert_eq!(
        doc.field("title", Some("da"), None).unwrap().value,
        FieldValue::text("Velkommen")
    );
}

#[tokio::test]
async fn test_member_items_only_reach_accepting_indexes() {
    let harness = TestHarness::new().await;
    let member = ContentItem::new(uuid::Uuid::new_v4(), ObjectType::Member, "jane");
    harness.add(&[&member]);

    harness
        .handle(vec![
            ContentChange::draft(member.id, ChangeType::Refresh)
                .with_object_type(ObjectType::Member),
            ContentChange::published(member.id, ChangeType::Refresh)
                .with_object_type(ObjectType::Member),
        ])
        .await;

    assert!(harness.document(DRAFT, member.id).is_some());
    assert!(harness.document(PUBLISHED, member.id).is_none());
}

struct Shadowing;

impl FieldProducer for Shadowing {
    fn index_fields(&self, _: &ContentItem, _: &[Option<String>], _: bool) -> Vec<IndexField> {
        vec![
            IndexField::new(field_names::NAME, FieldValue::text_r1("overridden")),
            IndexField::new("summary", FieldValue::text("extra")),
        ]
    }

    fn name(&self) -> &str {
        "shadowing"
    }
}

#[tokio::test]
async fn test_duplicate_fields_keep_first_writer() {
    let harness = TestHarness::with(IndexingConfig::default(), |builder| {
        builder.with_producer(Arc::new(Shadowing))
    })
    .await;
    let item = page("Original");
    harness.add(&[&item]);

    harness
        .handle(vec![ContentChange::draft(item.id, ChangeType::Refresh)])
        .await;

    let doc = harness.document(DRAFT, item.id).unwrap();
    let names: Vec<_> = doc
        .fields
        .iter()
        .filter(|f| f.field_name == field_names::NAME)
        .collect();
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].value, FieldValue::text_r1("Original"));
    assert!(doc.field("summary", None, None).is_some());
}
