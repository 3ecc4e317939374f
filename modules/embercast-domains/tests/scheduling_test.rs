//! Schedule coordinator and auto-scheduler against real Postgres.

use chrono::{Duration, Timelike, Utc};

use embercast_core::ScheduleStatus;
use embercast_domains::content::models::ContentItem;
use embercast_domains::fixtures::{
    seed_approved_content, seed_draft_content, seed_paused_tenant, seed_tenant, test_deps,
};
use embercast_domains::scheduling::activities::{
    autopilot_tick, publish_now, requeue_due_entries, schedule_content, ScheduleError,
};
use embercast_domains::scheduling::models::{AutoScheduleSettings, ScheduleEntry};
use embercast_domains::shared::tasks::Task;
use embercast_domains::testutil::postgres_container;

async fn task_count(kind: &str, pool: &sqlx::PgPool) -> i64 {
    sqlx::query_as::<_, (i64,)>("SELECT COUNT(*) FROM tasks WHERE kind = $1")
        .bind(kind)
        .fetch_one(pool)
        .await
        .unwrap()
        .0
}

#[tokio::test]
async fn repeat_schedule_requests_yield_one_entry_and_one_task() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();

    let when = Utc::now() + Duration::hours(1);
    let first = schedule_content(&deps, tenant.id, content.id, when).await.unwrap();
    let second = schedule_content(&deps, tenant.id, content.id, when).await.unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(task_count("publish", &pool).await, 1);

    let item = ContentItem::find(content.id, &pool).await.unwrap().unwrap();
    assert_eq!(item.schedule_entry_id, Some(first.id));
}

#[tokio::test]
async fn concurrent_schedule_requests_race_to_one_entry() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();

    let when = Utc::now() + Duration::hours(1);
    let (a, b) = tokio::join!(
        schedule_content(&deps, tenant.id, content.id, when),
        schedule_content(&deps, tenant.id, content.id, when),
    );
    let a = a.unwrap();
    let b = b.unwrap();
    assert_eq!(a.id, b.id);

    let entries = sqlx::query_as::<_, (i64,)>(
        "SELECT COUNT(*) FROM schedule_entries WHERE content_id = $1",
    )
    .bind(content.id)
    .fetch_one(&pool)
    .await
    .unwrap()
    .0;
    assert_eq!(entries, 1);
    assert_eq!(task_count("publish", &pool).await, 1);
}

#[tokio::test]
async fn paused_tenant_is_rejected_with_typed_error() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_paused_tenant(&pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();

    let err = schedule_content(&deps, tenant.id, content.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::TenantPaused));
    assert_eq!(err.body().code, "tenant_paused");
    assert_eq!(task_count("publish", &pool).await, 0);
}

#[tokio::test]
async fn completed_content_cannot_be_rescheduled() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();

    let entry = schedule_content(&deps, tenant.id, content.id, Utc::now()).await.unwrap();
    ScheduleEntry::mark_completed(entry.id, &pool).await.unwrap();

    let err = schedule_content(&deps, tenant.id, content.id, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, ScheduleError::AlreadyPublished));
}

#[tokio::test]
async fn publish_now_approves_draft_in_one_call() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    let draft = seed_draft_content(tenant.id, &pool).await.unwrap();

    let entry = publish_now(&deps, tenant.id, draft.id).await.unwrap();
    assert_eq!(entry.status_parsed().unwrap(), ScheduleStatus::Queued);

    let item = ContentItem::find(draft.id, &pool).await.unwrap().unwrap();
    assert_eq!(item.status, "approved");
    assert!(item.approved_at.is_some());
    assert_eq!(task_count("publish", &pool).await, 1);
}

#[tokio::test]
async fn cancellation_only_applies_while_queued() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();

    let entry = schedule_content(&deps, tenant.id, content.id, Utc::now()).await.unwrap();
    assert_eq!(ScheduleEntry::cancel(entry.id, &pool).await.unwrap(), 1);
    // Already cancelled: second cancel and completion are both no-ops.
    assert_eq!(ScheduleEntry::cancel(entry.id, &pool).await.unwrap(), 0);
    assert_eq!(ScheduleEntry::mark_completed(entry.id, &pool).await.unwrap(), 0);
}

#[tokio::test]
async fn cancelled_entry_releases_content_for_autopilot() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();

    let entry = schedule_content(&deps, tenant.id, content.id, Utc::now() + Duration::hours(1))
        .await
        .unwrap();
    assert_eq!(ScheduleEntry::cancel(entry.id, &pool).await.unwrap(), 1);

    // The association is gone, not just the entry status.
    let item = ContentItem::find(content.id, &pool).await.unwrap().unwrap();
    assert_eq!(item.status, "approved");
    assert_eq!(item.schedule_entry_id, None);
    assert_eq!(item.scheduled_for, None);

    // Age the cancelled entry out of the current minute so the duplicate-tick
    // guard does not mask the pick-up.
    sqlx::query("UPDATE schedule_entries SET created_at = created_at - interval '10 minutes'")
        .execute(&pool)
        .await
        .unwrap();

    AutoScheduleSettings::upsert(
        tenant.id,
        true,
        5,
        &minute_strings_around_now(),
        "UTC",
        &[0, 1, 2, 3, 4, 5, 6],
        &pool,
    )
    .await
    .unwrap();

    let stats = autopilot_tick(&deps).await.unwrap();
    assert_eq!(stats.scheduled, 1);
    let fresh = ScheduleEntry::active_for_content(content.id, &pool)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(fresh.id, entry.id);
}

fn minute_strings_around_now() -> Vec<String> {
    let now = Utc::now();
    let next = now + Duration::minutes(1);
    vec![
        format!("{:02}:{:02}", now.hour(), now.minute()),
        format!("{:02}:{:02}", next.hour(), next.minute()),
    ]
}

#[tokio::test]
async fn autopilot_schedules_in_a_matching_slot_once() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    seed_approved_content(tenant.id, &pool).await.unwrap();
    seed_approved_content(tenant.id, &pool).await.unwrap();

    AutoScheduleSettings::upsert(
        tenant.id,
        true,
        5,
        &minute_strings_around_now(),
        "UTC",
        &[0, 1, 2, 3, 4, 5, 6],
        &pool,
    )
    .await
    .unwrap();

    let first = autopilot_tick(&deps).await.unwrap();
    assert_eq!(first.scheduled, 1);

    // A duplicate tick in the same minute must not post again.
    let second = autopilot_tick(&deps).await.unwrap();
    assert_eq!(second.scheduled, 0);
    assert_eq!(task_count("publish", &pool).await, 1);
}

#[tokio::test]
async fn autopilot_enforces_daily_quota() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    seed_approved_content(tenant.id, &pool).await.unwrap();

    AutoScheduleSettings::upsert(
        tenant.id,
        true,
        0,
        &minute_strings_around_now(),
        "UTC",
        &[0, 1, 2, 3, 4, 5, 6],
        &pool,
    )
    .await
    .unwrap();

    let stats = autopilot_tick(&deps).await.unwrap();
    assert_eq!(stats.scheduled, 0);
    assert_eq!(stats.skipped_quota, 1);
    assert_eq!(task_count("publish", &pool).await, 0);
}

#[tokio::test]
async fn autopilot_skips_outside_preferred_times() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    seed_approved_content(tenant.id, &pool).await.unwrap();

    // A slot that is never "now": 60 minutes from the current minute.
    let later = Utc::now() + Duration::hours(2);
    AutoScheduleSettings::upsert(
        tenant.id,
        true,
        5,
        &[format!("{:02}:{:02}", later.hour(), later.minute())],
        "UTC",
        &[0, 1, 2, 3, 4, 5, 6],
        &pool,
    )
    .await
    .unwrap();

    let stats = autopilot_tick(&deps).await.unwrap();
    assert_eq!(stats.scheduled, 0);
    assert_eq!(stats.skipped_no_slot, 1);
}

#[tokio::test]
async fn requeue_scan_heals_entries_with_lost_tasks() {
    let (_pg, pool) = postgres_container().await;
    let (deps, _platform) = test_deps(pool.clone());
    let tenant = seed_tenant(&pool).await.unwrap();
    let content = seed_approved_content(tenant.id, &pool).await.unwrap();

    let when = Utc::now() - Duration::minutes(30);
    let entry = schedule_content(&deps, tenant.id, content.id, when).await.unwrap();

    // Simulate a dead-lettered task.
    sqlx::query("DELETE FROM tasks WHERE kind = 'publish'")
        .execute(&pool)
        .await
        .unwrap();
    assert!(!Task::publish_task_exists(entry.id, &pool).await.unwrap());

    let requeued = requeue_due_entries(&deps).await.unwrap();
    assert_eq!(requeued, 1);
    assert!(Task::publish_task_exists(entry.id, &pool).await.unwrap());

    // A second scan is a no-op while the task is live.
    assert_eq!(requeue_due_entries(&deps).await.unwrap(), 0);
}
