//! Crash repair: a schedule entry whose publish task was lost (enqueue
//! failure, dead-lettered task) would otherwise sit queued forever. The scan
//! re-enqueues overdue entries with no live task. Safe to run in multiple
//! replicas — the executor is replay-proof.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};

use embercast_core::ServerDeps;

use crate::scheduling::models::ScheduleEntry;
use crate::shared::tasks::{Task, TaskPayload};

/// How far past `scheduled_for` an entry must be before repair kicks in.
const REQUEUE_GRACE_SECS: i64 = 300;

pub async fn requeue_due_entries(deps: &ServerDeps) -> Result<usize> {
    let pool = deps.pool();
    let mut requeued = 0;

    for entry in ScheduleEntry::overdue_queued(REQUEUE_GRACE_SECS, pool).await? {
        if Task::publish_task_exists(entry.id, pool).await? {
            continue;
        }
        warn!(
            entry_id = %entry.id,
            content_id = %entry.content_id,
            scheduled_for = %entry.scheduled_for,
            "Overdue schedule entry has no publish task, re-enqueuing"
        );
        Task::enqueue(
            &TaskPayload::Publish {
                schedule_entry_id: entry.id,
                approved_content_id: entry.content_id,
                tenant_id: entry.tenant_id,
            },
            Utc::now(),
            deps.config.queue_max_attempts,
            pool,
        )
        .await?;
        requeued += 1;
    }

    if requeued > 0 {
        info!(requeued, "Requeue scan complete");
    }
    Ok(requeued)
}
