//! Rollback / dedup resolver semantics.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use embercast_core::PlatformResponse;
use embercast_domains::fixtures::{seed_approved_content, seed_credential, seed_tenant, test_deps, FakePlatform};
use embercast_domains::publishing::activities::{rollback_attempt, rollback_duplicates, RollbackError};
use embercast_domains::publishing::models::PublishAttempt;
use embercast_domains::scheduling::models::ScheduleEntry;
use embercast_domains::testutil::postgres_container;

/// Record a successful attempt against a fresh schedule entry, spaced out so
/// attempted_at ordering is deterministic.
async fn seed_success(
    tenant_id: Uuid,
    content_id: Uuid,
    resp: PlatformResponse,
    pool: &PgPool,
) -> PublishAttempt {
    let entry = ScheduleEntry::insert_queued(
        tenant_id,
        content_id,
        Utc::now(),
        &Uuid::new_v4().to_string(),
        pool,
    )
    .await
    .unwrap()
    .unwrap();
    ScheduleEntry::mark_completed(entry.id, pool).await.unwrap();
    let attempt = PublishAttempt::record(entry.id, content_id, tenant_id, "linkedin", &resp, pool)
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    attempt
}

#[tokio::test]
async fn duplicates_roll_back_all_but_the_oldest() {
    let (_pg, pool) = postgres_container().await;
    let (deps, platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    seed_credential(tenant.id, &pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();

    let oldest = seed_success(
        tenant.id,
        content.id,
        FakePlatform::success_response("urn:li:share:1"),
        &pool,
    )
    .await;
    seed_success(
        tenant.id,
        content.id,
        FakePlatform::success_response("urn:li:share:2"),
        &pool,
    )
    .await;
    seed_success(
        tenant.id,
        content.id,
        FakePlatform::success_response("urn:li:share:3"),
        &pool,
    )
    .await;

    let report = rollback_duplicates(&deps, tenant.id).await.unwrap();
    assert_eq!(report.len(), 2);
    assert!(report.iter().all(|r| r.rolled_back));

    let mut deleted = platform.deleted_refs();
    deleted.sort();
    assert_eq!(deleted, vec!["urn:li:share:2", "urn:li:share:3"]);

    let kept = PublishAttempt::find(oldest.id, &pool).await.unwrap().unwrap();
    assert!(!kept.rolled_back);
    assert!(kept.rolled_back_at.is_none());

    // Nothing left to do on a second pass.
    assert!(rollback_duplicates(&deps, tenant.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn single_success_is_not_a_duplicate() {
    let (_pg, pool) = postgres_container().await;
    let (deps, platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    seed_credential(tenant.id, &pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();

    seed_success(
        tenant.id,
        content.id,
        FakePlatform::success_response("urn:li:share:solo"),
        &pool,
    )
    .await;

    assert!(rollback_duplicates(&deps, tenant.id).await.unwrap().is_empty());
    assert!(platform.deleted_refs().is_empty());
}

#[tokio::test]
async fn ineligible_attempts_fail_fast_without_platform_calls() {
    let (_pg, pool) = postgres_container().await;
    let (deps, platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    seed_credential(tenant.id, &pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();

    let success = seed_success(
        tenant.id,
        content.id,
        FakePlatform::success_response("urn:li:share:a"),
        &pool,
    )
    .await;
    let failed = seed_success(
        tenant.id,
        content.id,
        FakePlatform::failure_response(500, "boom"),
        &pool,
    )
    .await;

    // Rolling back a failed attempt is rejected before any delete call.
    let err = rollback_attempt(&deps, failed.id).await.unwrap_err();
    assert!(matches!(err, RollbackError::NotSuccessful));
    assert_eq!(err.body().code, "not_successful");

    // Roll the successful one back, then again: already rolled back.
    rollback_attempt(&deps, success.id).await.unwrap();
    let err = rollback_attempt(&deps, success.id).await.unwrap_err();
    assert!(matches!(err, RollbackError::AlreadyRolledBack));

    assert_eq!(platform.deleted_refs().len(), 1);

    let err = rollback_attempt(&deps, Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, RollbackError::NotFound));
}

#[tokio::test]
async fn post_ref_falls_back_to_stored_url() {
    let (_pg, pool) = postgres_container().await;
    let (deps, platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    seed_credential(tenant.id, &pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();

    let resp = PlatformResponse {
        success: true,
        status: Some(201),
        post_ref: None,
        post_url: Some("https://www.linkedin.com/feed/update/urn:li:share:legacy/".to_string()),
        ..Default::default()
    };
    let attempt = seed_success(tenant.id, content.id, resp, &pool).await;

    rollback_attempt(&deps, attempt.id).await.unwrap();
    assert_eq!(platform.deleted_refs(), vec!["urn:li:share:legacy"]);
}

#[tokio::test]
async fn bulk_rollback_reports_failures_without_aborting() {
    let (_pg, pool) = postgres_container().await;
    let (deps, platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    seed_credential(tenant.id, &pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();
    let other = seed_approved_content(tenant.id, &pool).await.unwrap();

    // First duplicate pair: the newer attempt has no post reference at all.
    seed_success(
        tenant.id,
        content.id,
        FakePlatform::success_response("urn:li:share:keep1"),
        &pool,
    )
    .await;
    let broken = PlatformResponse {
        success: true,
        status: Some(201),
        ..Default::default()
    };
    seed_success(tenant.id, content.id, broken, &pool).await;

    // Second duplicate pair: fully rollbackable.
    seed_success(
        tenant.id,
        other.id,
        FakePlatform::success_response("urn:li:share:keep2"),
        &pool,
    )
    .await;
    seed_success(
        tenant.id,
        other.id,
        FakePlatform::success_response("urn:li:share:extra"),
        &pool,
    )
    .await;

    let report = rollback_duplicates(&deps, tenant.id).await.unwrap();
    assert_eq!(report.len(), 2);
    let ok: Vec<_> = report.iter().filter(|r| r.rolled_back).collect();
    let failed: Vec<_> = report.iter().filter(|r| !r.rolled_back).collect();
    assert_eq!(ok.len(), 1);
    assert_eq!(failed.len(), 1);
    assert!(failed[0].error.as_deref().unwrap().contains("post reference"));
    assert_eq!(platform.deleted_refs(), vec!["urn:li:share:extra"]);
}
