//! Momentum cycle against real Postgres: clustering, snapshots, edges, and
//! the action queue trigger.

use chrono::{Duration, Utc};

use embercast_core::ActionStatus;
use embercast_domains::content::models::Signal;
use embercast_domains::fixtures::{seed_tenant, test_deps};
use embercast_domains::momentum::activities::run_momentum_cycle;
use embercast_domains::momentum::models::{
    ActionQueueEntry, CorrelationEdge, MomentumSnapshot, TopicCluster,
};
use embercast_domains::testutil::postgres_container;

#[tokio::test]
async fn cycle_clusters_signals_and_snapshots_topics() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();

    let now = Utc::now();
    for i in 0..4 {
        Signal::create(
            tenant.id,
            &format!("https://example.com/article-{i}"),
            &format!("Article {i}"),
            if i % 2 == 0 { "source-a" } else { "source-b" },
            0.8,
            now - Duration::hours(i),
            &pool,
        )
        .await
        .unwrap();
    }

    let stats = run_momentum_cycle(&deps, tenant.id).await.unwrap();
    assert_eq!(stats.signals_clustered, 4);
    assert_eq!(stats.topics_scored, 1);
    assert_eq!(stats.edges_updated, 2);

    let topic = TopicCluster::default_for_tenant(tenant.id, &pool).await.unwrap();
    let snapshot = MomentumSnapshot::find(topic.id, &pool).await.unwrap().unwrap();
    assert_eq!(snapshot.current_count, 4);
    assert_eq!(snapshot.previous_count, 0);
    // Growth from a zero baseline: velocity defaults to 1.
    assert!((snapshot.velocity - 1.0).abs() < 1e-9);
    assert!((0.0..=1.0).contains(&snapshot.hot_score));

    let edges = CorrelationEdge::for_topic(topic.id, &pool).await.unwrap();
    assert_eq!(edges.len(), 2);
    assert!(edges.iter().all(|e| (0.0..=1.0).contains(&e.strength)));
    assert_eq!(edges.iter().map(|e| e.frequency).sum::<i64>(), 4);
}

#[tokio::test]
async fn hot_topic_queues_at_most_one_pending_action() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();

    // Fresh burst of signals: well above the 0.25 threshold.
    for i in 0..6 {
        Signal::create(
            tenant.id,
            &format!("https://example.com/hot-{i}"),
            &format!("Hot story {i}"),
            &format!("source-{i}"),
            0.9,
            Utc::now(),
            &pool,
        )
        .await
        .unwrap();
    }

    let first = run_momentum_cycle(&deps, tenant.id).await.unwrap();
    assert_eq!(first.actions_queued, 1);

    // A second cycle overwrites the snapshot but must not duplicate the
    // pending entry.
    let second = run_momentum_cycle(&deps, tenant.id).await.unwrap();
    assert_eq!(second.actions_queued, 0);

    let pending = ActionQueueEntry::pending_for_tenant(tenant.id, &pool).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert!(pending[0].hot_score >= 0.25);

    // Resolving the entry frees the slot for a future spike.
    ActionQueueEntry::set_status(pending[0].id, ActionStatus::Generated, &pool)
        .await
        .unwrap();
    let third = run_momentum_cycle(&deps, tenant.id).await.unwrap();
    assert_eq!(third.actions_queued, 1);
}

#[tokio::test]
async fn duplicate_signals_are_deduplicated_by_content_hash() {
    let (_pg, pool) = postgres_container().await;
    let tenant = seed_tenant(&pool).await.unwrap();

    let created = Signal::create(
        tenant.id,
        "https://example.com/same",
        "Same story",
        "source-a",
        0.7,
        Utc::now(),
        &pool,
    )
    .await
    .unwrap();
    assert!(created.is_some());

    let duplicate = Signal::create(
        tenant.id,
        "https://example.com/same",
        "Same story",
        "source-b",
        0.7,
        Utc::now(),
        &pool,
    )
    .await
    .unwrap();
    assert!(duplicate.is_none());
}
