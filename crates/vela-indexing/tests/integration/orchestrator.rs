//! Orchestrator wiring: queueing, policies, configuration.

use std::sync::Arc;
use std::time::Duration;

use vela_core::{ChangeType, ContentChange, Document, IndexingConfig};
use vela_fts::HealthStatus;
use vela_indexing::{IndexInfo, PolicyDecision, QueueMode};
use vela_storage::DocumentCache;

use crate::common::{DRAFT, PUBLISHED, TestHarness, page, sorted_ids};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_background_queue_drains() {
    let harness = TestHarness::with(IndexingConfig::default(), |builder| {
        builder.with_queue_mode(QueueMode::Background {
            workers: 2,
            capacity: 16,
        })
    })
    .await;
    let root = page("Home");
    let child = page("About").under(&root);
    harness.add(&[&root, &child]);

    harness
        .handle(vec![ContentChange::published(root.id, ChangeType::RefreshBranch)])
        .await;
    harness
        .orchestrator
        .wait_idle(Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(harness.ids(PUBLISHED), sorted_ids(&[&root, &child]));
    assert_eq!(harness.ids(DRAFT), sorted_ids(&[&root, &child]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_batches_for_one_item_apply_in_order() {
    let harness = TestHarness::slow(Duration::from_millis(200)).await;
    let item = page("Short lived");
    harness.add(&[&item]);

    harness
        .handle(vec![ContentChange::draft(item.id, ChangeType::Refresh)])
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    harness.repository.remove(item.id);
    harness
        .handle(vec![ContentChange::draft(item.id, ChangeType::Remove)])
        .await;
    harness
        .orchestrator
        .wait_idle(Duration::from_secs(5))
        .await
        .unwrap();

    assert!(harness.document(DRAFT, item.id).is_none());
    assert!(harness.cache.get(item.id, DRAFT).await.unwrap().is_none());
}

#[tokio::test]
async fn test_queued_rebuild_reports_health() {
    let harness = TestHarness::new().await;
    let root = page("Home");
    harness.add(&[&root]);

    assert_eq!(
        harness.orchestrator.health_status(PUBLISHED).await.unwrap(),
        HealthStatus::Unknown
    );
    harness.orchestrator.rebuild(PUBLISHED, false).await.unwrap();
    assert_eq!(
        harness.orchestrator.health_status(PUBLISHED).await.unwrap(),
        HealthStatus::Healthy
    );
}

fn skip_secret_in_published(index: &IndexInfo, document: &Document) -> PolicyDecision {
    let secret = document
        .field("content_type", None, None)
        .is_some_and(|f| f.value.keywords.iter().any(|k| k == "secret"));
    if secret && index.alias == PUBLISHED {
        PolicyDecision::Skip
    } else {
        PolicyDecision::Index
    }
}

#[tokio::test]
async fn test_policy_vetoes_one_index_only() {
    let harness = TestHarness::with(IndexingConfig::default(), |builder| {
        builder.with_policy(Arc::new(skip_secret_in_published))
    })
    .await;
    let item = page("Payroll").with_content_type("secret");
    harness.add(&[&item]);

    let stats = harness
        .orchestrator
        .dispatch(&[ContentChange::published(item.id, ChangeType::Refresh)])
        .await
        .unwrap();

    assert_eq!(stats.indexed, 1);
    assert_eq!(stats.skipped_by_policy, 1);
    assert!(harness.document(DRAFT, item.id).is_some());
    assert!(harness.document(PUBLISHED, item.id).is_none());
    assert!(harness.cache.get(item.id, PUBLISHED).await.unwrap().is_none());
    assert!(harness.cache.get(item.id, DRAFT).await.unwrap().is_some());
}

#[tokio::test]
async fn test_builds_from_toml() {
    let config = IndexingConfig::from_toml_str(
        r#"
        [[indexes]]
        alias = "site"
        strategy = "published"
        object_types = ["content"]

        [queue]
        immediate = true
        "#,
    )
    .unwrap();
    let harness = TestHarness::with(config, |builder| builder).await;
    assert_eq!(harness.orchestrator.aliases(), vec!["site"]);

    let item = page("Home");
    harness.add(&[&item]);
    harness
        .handle(vec![ContentChange::published(item.id, ChangeType::Refresh)])
        .await;
    assert!(harness.document("site", item.id).is_some());
}

#[cfg(all(feature = "fts-tantivy", feature = "cache-sqlite"))]
#[tokio::test]
async fn test_persistent_backends_from_config() {
    use vela_core::MemoryContentRepository;
    use vela_indexing::{IndexingOrchestrator, PropertyValueFieldProducer, SystemFieldProducer};

    let dir = tempfile::tempdir().unwrap();
    let mut config = IndexingConfig::default();
    config.store.backend = "tantivy".into();
    config.store.path = Some(dir.path().join("indexes").display().to_string());
    config.cache.backend = "sqlite".into();
    config.cache.path = Some(dir.path().join("cache.db").display().to_string());

    let repository = Arc::new(MemoryContentRepository::new());
    let root = page("Home");
    let child = page("About").under(&root);
    repository.upsert(root.clone());
    repository.upsert(child.clone());

    let orchestrator = IndexingOrchestrator::builder(config)
        .with_repository(repository)
        .with_producer(Arc::new(SystemFieldProducer))
        .with_producer(Arc::new(PropertyValueFieldProducer))
        .with_queue_mode(QueueMode::Immediate)
        .build()
        .await
        .unwrap();

    orchestrator
        .handle(vec![ContentChange::published(root.id, ChangeType::RefreshBranch)])
        .await
        .unwrap();
    assert_eq!(
        orchestrator.health_status(PUBLISHED).await.unwrap(),
        HealthStatus::Healthy
    );

    let outcome = orchestrator.run_rebuild(PUBLISHED, true).await.unwrap();
    assert!(matches!(
        outcome,
        vela_indexing::RebuildOutcome::Completed(s) if s.from_cache == 2
    ));
    let store = orchestrator.manager().store();
    let active = orchestrator.manager().resolve_active_index_name(PUBLISHED);
    assert_eq!(store.document_count(&active).unwrap(), 2);
}
