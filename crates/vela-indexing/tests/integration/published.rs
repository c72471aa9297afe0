//! Published strategy behaviour.

use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;
use vela_acl::{AccessRule, MemoryAccessKeyDirectory, PublicAccessEntry, PublicAccessResolver};
use vela_core::{
    ChangeType, ContentChange, IndexingConfig, PropertyValue, Variation, field_names,
};
use vela_storage::DocumentCache;

use crate::common::{DRAFT, PUBLISHED, TestHarness, page, sorted_ids};

#[tokio::test]
async fn test_cultures_intersect_with_ancestors() {
    let harness = TestHarness::new().await;
    let root = page("Home").with_cultures(&["en", "da"], &["en"]);
    let mut child = page("About")
        .with_cultures(&["en", "da"], &["en", "da"])
        .with_property(PropertyValue::invariant("title", json!("About us")).with_culture("en"))
        .with_property(PropertyValue::invariant("title", json!("Om os")).with_culture("da"))
        .under(&root);
    child.culture_names.insert("da".into(), "Om".into());
    harness.add(&[&root, &child]);

    harness
        .handle(vec![ContentChange::published(child.id, ChangeType::Refresh)])
        .await;

    let doc = harness.document(PUBLISHED, child.id).unwrap();
    assert_eq!(doc.variations, vec![Variation::culture("en")]);
    assert!(doc.field("title", Some("en"), None).is_some());
    assert!(doc.field("title", Some("da"), None).is_none());
    assert!(doc.field(field_names::NAME, Some("da"), None).is_none());
}

#[tokio::test]
async fn test_unpublished_root_blocks_branch() {
    let harness = TestHarness::new().await;
    let root = page("Home").with_published(false);
    let child = page("About").under(&root);
    let grandchild = page("Team").under(&child);
    harness.add(&[&root, &child, &grandchild]);

    let stats = harness
        .orchestrator
        .dispatch(&[ContentChange::published(root.id, ChangeType::RefreshBranch)])
        .await
        .unwrap();

    assert!(harness.ids(PUBLISHED).is_empty());
    assert_eq!(harness.ids(DRAFT), sorted_ids(&[&root, &child, &grandchild]));
    assert_eq!(stats.indexed, 3);
    assert_eq!(stats.removed, 3);
}

#[tokio::test]
async fn test_unpublishing_root_removes_indexed_branch() {
    let harness = TestHarness::new().await;
    let root = page("Home");
    let child = page("About").under(&root);
    let grandchild = page("Team").under(&child);
    harness.add(&[&root, &child, &grandchild]);

    harness
        .handle(vec![ContentChange::published(root.id, ChangeType::RefreshBranch)])
        .await;
    assert_eq!(
        harness.ids(PUBLISHED),
        sorted_ids(&[&root, &child, &grandchild])
    );

    harness.repository.update(root.id, |item| item.published = false);
    harness
        .handle(vec![ContentChange::published(root.id, ChangeType::RefreshBranch)])
        .await;

    assert!(harness.ids(PUBLISHED).is_empty());
    assert!(harness.cache.get(grandchild.id, PUBLISHED).await.unwrap().is_none());
}

#[tokio::test]
async fn test_trashed_item_is_removed() {
    let harness = TestHarness::new().await;
    let item = page("Old news");
    harness.add(&[&item]);
    harness
        .handle(vec![ContentChange::published(item.id, ChangeType::Refresh)])
        .await;
    assert!(harness.document(PUBLISHED, item.id).is_some());

    harness.repository.update(item.id, |item| item.trashed = true);
    harness
        .handle(vec![ContentChange::published(item.id, ChangeType::Refresh)])
        .await;

    assert!(harness.document(PUBLISHED, item.id).is_none());
}

#[tokio::test]
async fn test_remove_then_refresh_keeps_published_item() {
    let harness = TestHarness::new().await;
    let item = page("Home");
    harness.add(&[&item]);
    harness
        .handle(vec![ContentChange::published(item.id, ChangeType::Refresh)])
        .await;

    harness
        .handle(vec![
            ContentChange::published(item.id, ChangeType::Remove),
            ContentChange::published(item.id, ChangeType::Refresh),
        ])
        .await;

    assert!(harness.document(PUBLISHED, item.id).is_some());
    assert!(harness.cache.get(item.id, PUBLISHED).await.unwrap().is_some());
}

#[tokio::test]
async fn test_refresh_then_remove_unpublishes_item() {
    let harness = TestHarness::new().await;
    let item = page("Home");
    harness.add(&[&item]);

    let stats = harness
        .orchestrator
        .dispatch(&[
            ContentChange::published(item.id, ChangeType::Refresh),
            ContentChange::published(item.id, ChangeType::Remove),
        ])
        .await
        .unwrap();

    assert!(harness.document(PUBLISHED, item.id).is_none());
    assert!(harness.cache.get(item.id, PUBLISHED).await.unwrap().is_none());
    assert!(stats.removed >= 1);
}

#[tokio::test]
async fn test_draft_changes_do_not_touch_published_index() {
    let harness = TestHarness::new().await;
    let item = page("Home");
    harness.add(&[&item]);

    harness
        .handle(vec![ContentChange::draft(item.id, ChangeType::Refresh)])
        .await;

    assert!(harness.document(DRAFT, item.id).is_some());
    assert!(harness.document(PUBLISHED, item.id).is_none());
}

#[tokio::test]
async fn test_segments_become_variations() {
    let harness = TestHarness::new().await;
    let item = page("Landing")
        .with_property(PropertyValue::invariant("teaser", json!("Hello")))
        .with_property(PropertyValue::invariant("teaser", json!("Hello VIP")).with_segment("vip"));
    harness.add(&[&item]);

    harness
        .handle(vec![ContentChange::published(item.id, ChangeType::Refresh)])
        .await;

    let doc = harness.document(PUBLISHED, item.id).unwrap();
    assert_eq!(
        doc.variations,
        vec![
            Variation::invariant(),
            Variation::new(None, Some("vip".into()))
        ]
    );
    assert!(doc.field("teaser", None, Some("vip")).is_some());
}

#[tokio::test]
async fn test_protection_is_attached() {
    let members = Uuid::new_v4();
    let directory = MemoryAccessKeyDirectory::new().with_role("members", members);
    let root = page("Home");
    let secret = page("Members area").under(&root);
    let resolver = PublicAccessResolver::new(Arc::new(directory)).with_entry(
        secret.id,
        PublicAccessEntry::new(vec![AccessRule::MemberRole("members".into())]),
    );

    let harness = TestHarness::with(IndexingConfig::default(), |builder| {
        builder.with_protection(Arc::new(resolver))
    })
    .await;
    harness.add(&[&root, &secret]);

    harness
        .handle(vec![ContentChange::published(root.id, ChangeType::RefreshBranch)])
        .await;

    assert!(harness.document(PUBLISHED, root.id).unwrap().protection.is_none());
    let protection = harness
        .document(PUBLISHED, secret.id)
        .unwrap()
        .protection
        .unwrap();
    assert_eq!(protection.access_keys(), &[members]);
}
