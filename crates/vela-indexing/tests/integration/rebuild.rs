//! Rebuilds through the active/shadow slots.

use std::sync::{Arc, OnceLock};

use vela_core::{ChangeType, ContentChange, Document, IndexingConfig, Variation};
use vela_fts::Slot;
use vela_indexing::{
    IndexInfo, IndexingOrchestrator, IndexingPolicy, PolicyDecision, RebuildOutcome, RebuildStats,
};
use vela_storage::DocumentCache;

use crate::common::{DRAFT, PUBLISHED, TestHarness, page, sorted_ids};

#[tokio::test]
async fn test_rebuild_fills_shadow_and_swaps() {
    let harness = TestHarness::new().await;
    let root = page("Home");
    let child = page("About").under(&root);
    let hidden = page("Draft only").with_published(false).under(&root);
    harness.add(&[&root, &child, &hidden]);

    let manager = harness.orchestrator.manager().clone();
    assert_eq!(manager.state(PUBLISHED).active_slot, Slot::A);

    let outcome = harness
        .orchestrator
        .run_rebuild(PUBLISHED, false)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RebuildOutcome::Completed(RebuildStats {
            indexed: 2,
            removed: 1,
            ..RebuildStats::default()
        })
    );

    assert_eq!(manager.state(PUBLISHED).active_slot, Slot::B);
    assert!(!manager.is_rebuilding(PUBLISHED));
    assert_eq!(harness.ids(PUBLISHED), sorted_ids(&[&root, &child]));
    // Other aliases keep their own slot.
    assert_eq!(manager.state(DRAFT).active_slot, Slot::A);
}

#[tokio::test]
async fn test_draft_rebuild_includes_everything() {
    let harness = TestHarness::new().await;
    let root = page("Home").with_published(false);
    let child = page("About").under(&root);
    harness.add(&[&root, &child]);

    let outcome = harness.orchestrator.run_rebuild(DRAFT, false).await.unwrap();
    assert!(matches!(outcome, RebuildOutcome::Completed(s) if s.indexed == 2));
    assert_eq!(harness.ids(DRAFT), sorted_ids(&[&root, &child]));
}

#[tokio::test]
async fn test_cached_documents_are_reused() {
    let harness = TestHarness::new().await;
    let root = page("Home");
    let child = page("About").under(&root);
    harness.add(&[&root, &child]);
    harness
        .handle(vec![ContentChange::published(root.id, ChangeType::RefreshBranch)])
        .await;
    let computed = harness.counter.calls();

    let outcome = harness
        .orchestrator
        .run_rebuild(PUBLISHED, true)
        .await
        .unwrap();
    assert!(matches!(outcome, RebuildOutcome::Completed(s) if s.from_cache == 2 && s.indexed == 2));
    assert_eq!(harness.counter.calls(), computed);

    let outcome = harness
        .orchestrator
        .run_rebuild(PUBLISHED, false)
        .await
        .unwrap();
    assert!(matches!(outcome, RebuildOutcome::Completed(s) if s.from_cache == 0));
    assert_eq!(harness.counter.calls(), computed + 2);
}

#[tokio::test]
async fn test_recomputing_rebuild_drops_stale_cache_rows() {
    let harness = TestHarness::new().await;
    let kept = page("Home");
    let dropped = page("Gone");
    harness.add(&[&kept, &dropped]);
    harness
        .handle(vec![
            ContentChange::draft(kept.id, ChangeType::Refresh),
            ContentChange::draft(dropped.id, ChangeType::Refresh),
        ])
        .await;
    harness.repository.remove(dropped.id);

    let outcome = harness.orchestrator.run_rebuild(DRAFT, false).await.unwrap();
    assert!(matches!(outcome, RebuildOutcome::Completed(s) if s.indexed == 1));
    assert!(harness.cache.get(kept.id, DRAFT).await.unwrap().is_some());
    assert!(harness.cache.get(dropped.id, DRAFT).await.unwrap().is_none());
}

#[tokio::test]
async fn test_cached_documents_are_revalidated() {
    let harness = TestHarness::new().await;
    let root = page("Home").with_cultures(&["en", "da"], &["en", "da"]);
    let child = page("About")
        .with_cultures(&["en", "da"], &["en", "da"])
        .under(&root);
    harness.add(&[&root, &child]);
    harness
        .handle(vec![ContentChange::published(root.id, ChangeType::RefreshBranch)])
        .await;
    assert_eq!(harness.document(PUBLISHED, child.id).unwrap().variations.len(), 2);

    harness
        .repository
        .update(root.id, |item| item.published_cultures = vec!["en".into()]);
    let outcome = harness
        .orchestrator
        .run_rebuild(PUBLISHED, true)
        .await
        .unwrap();
    assert!(matches!(outcome, RebuildOutcome::Completed(s) if s.from_cache == 2));

    let doc = harness.document(PUBLISHED, child.id).unwrap();
    assert_eq!(doc.variations, vec![Variation::culture("en")]);
    assert!(doc.fields.iter().all(|f| f.culture.as_deref() != Some("da")));
}

#[tokio::test]
async fn test_second_rebuild_is_refused() {
    let harness = TestHarness::new().await;
    let manager = harness.orchestrator.manager().clone();
    assert!(manager.start_rebuilding(PUBLISHED));

    let outcome = harness
        .orchestrator
        .run_rebuild(PUBLISHED, false)
        .await
        .unwrap();
    assert_eq!(outcome, RebuildOutcome::AlreadyRebuilding);
    assert!(manager.is_rebuilding(PUBLISHED));
    assert_eq!(manager.state(PUBLISHED).active_slot, Slot::A);
}

#[tokio::test]
async fn test_changes_during_rebuild_land_in_shadow() {
    let harness = TestHarness::new().await;
    let item = page("Home");
    harness.add(&[&item]);
    let manager = harness.orchestrator.manager().clone();

    assert!(manager.start_rebuilding(PUBLISHED));
    harness
        .handle(vec![ContentChange::published(item.id, ChangeType::Refresh)])
        .await;
    assert!(harness.document(PUBLISHED, item.id).is_none());

    manager.complete_rebuilding(PUBLISHED);
    assert!(harness.document(PUBLISHED, item.id).is_some());
}

/// Cancels the rebuild of an alias on the first write it sees.
struct CancelOnFirstWrite {
    orchestrator: OnceLock<IndexingOrchestrator>,
}

impl IndexingPolicy for CancelOnFirstWrite {
    fn decide(&self, index: &IndexInfo, _: &Document) -> PolicyDecision {
        if let Some(orchestrator) = self.orchestrator.get() {
            orchestrator.cancel_rebuild(&index.alias);
        }
        PolicyDecision::Index
    }
}

#[tokio::test]
async fn test_cancelled_rebuild_keeps_active_slot() {
    let policy = Arc::new(CancelOnFirstWrite {
        orchestrator: OnceLock::new(),
    });
    let harness = TestHarness::with(IndexingConfig::default(), |builder| {
        builder.with_policy(policy.clone())
    })
    .await;
    let first = page("First");
    let second = page("Second");
    harness.add(&[&first, &second]);
    policy
        .orchestrator
        .set(harness.orchestrator.clone())
        .unwrap();

    let outcome = harness
        .orchestrator
        .run_rebuild(PUBLISHED, false)
        .await
        .unwrap();
    assert_eq!(
        outcome,
        RebuildOutcome::Cancelled(RebuildStats {
            indexed: 1,
            cancelled: true,
            ..RebuildStats::default()
        })
    );

    let manager = harness.orchestrator.manager();
    assert_eq!(manager.state(PUBLISHED).active_slot, Slot::A);
    assert!(!manager.is_rebuilding(PUBLISHED));
    assert!(!harness.orchestrator.cancel_rebuild(PUBLISHED));
}
