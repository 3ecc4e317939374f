//! Schedule Coordinator: approved content + target time in, exactly one
//! durable schedule entry and one queued publish task out. Repeats of the
//! same logical request return the existing entry instead of a duplicate.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use embercast_core::{ContentStatus, ErrorBody, ServerDeps};

use crate::content::models::ContentItem;
use crate::scheduling::models::ScheduleEntry;
use crate::shared::tasks::{Task, TaskPayload};
use crate::shared::tenants::Tenant;

#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("tenant is paused")]
    TenantPaused,

    #[error("content item not found")]
    ContentNotFound,

    #[error("content has already been published")]
    AlreadyPublished,

    #[error("content is not schedulable in status {0}")]
    NotSchedulable(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ScheduleError {
    pub fn code(&self) -> &'static str {
        match self {
            ScheduleError::TenantPaused => "tenant_paused",
            ScheduleError::ContentNotFound => "content_not_found",
            ScheduleError::AlreadyPublished => "already_published",
            ScheduleError::NotSchedulable(_) => "not_schedulable",
            ScheduleError::Other(_) => "internal",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody::new(self.code(), self.to_string())
    }
}

/// Idempotency key for one logical schedule request.
pub fn idempotency_key(content_id: Uuid, scheduled_for: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content_id.as_bytes());
    hasher.update(scheduled_for.timestamp_millis().to_be_bytes());
    hex::encode(hasher.finalize())
}

/// Create exactly one schedule entry and one publish task for approved
/// content, or return the existing queued entry for a repeat request.
pub async fn schedule_content(
    deps: &ServerDeps,
    tenant_id: Uuid,
    content_id: Uuid,
    scheduled_for: DateTime<Utc>,
) -> Result<ScheduleEntry, ScheduleError> {
    let pool = deps.pool();

    if Tenant::is_paused(tenant_id, pool).await.map_err(ScheduleError::Other)? {
        return Err(ScheduleError::TenantPaused);
    }

    let content = ContentItem::find(content_id, pool)
        .await
        .map_err(ScheduleError::Other)?
        .filter(|c| c.tenant_id == tenant_id)
        .ok_or(ScheduleError::ContentNotFound)?;

    match content.status_parsed().map_err(ScheduleError::Other)? {
        ContentStatus::Approved => {}
        ContentStatus::Published => return Err(ScheduleError::AlreadyPublished),
        other => return Err(ScheduleError::NotSchedulable(other.to_string())),
    }

    if ScheduleEntry::completed_exists_for_content(content_id, None, pool)
        .await
        .map_err(ScheduleError::Other)?
    {
        return Err(ScheduleError::AlreadyPublished);
    }

    // Repeat of an in-flight request: hand back the existing entry, no
    // second task.
    if let Some(existing) = ScheduleEntry::active_for_content(content_id, pool)
        .await
        .map_err(ScheduleError::Other)?
    {
        return Ok(existing);
    }

    let key = idempotency_key(content_id, scheduled_for);
    let Some(entry) =
        ScheduleEntry::insert_queued(tenant_id, content_id, scheduled_for, &key, pool)
            .await
            .map_err(ScheduleError::Other)?
    else {
        // Lost the insert race; the winner owns the publish task.
        return ScheduleEntry::active_for_content(content_id, pool)
            .await
            .map_err(ScheduleError::Other)?
            .ok_or_else(|| {
                ScheduleError::Other(anyhow!(
                    "schedule insert conflicted but no queued entry found for content {content_id}"
                ))
            });
    };

    ContentItem::set_schedule(content_id, entry.id, scheduled_for, pool)
        .await
        .map_err(ScheduleError::Other)?;

    // Enqueued only after the entry row is durably committed. If this fails
    // the requeue scan heals the orphaned entry.
    Task::enqueue(
        &TaskPayload::Publish {
            schedule_entry_id: entry.id,
            approved_content_id: content_id,
            tenant_id,
        },
        scheduled_for,
        deps.config.queue_max_attempts,
        pool,
    )
    .await
    .map_err(ScheduleError::Other)?;

    info!(
        tenant_id = %tenant_id,
        content_id = %content_id,
        entry_id = %entry.id,
        scheduled_for = %scheduled_for,
        "Content scheduled"
    );
    Ok(entry)
}

/// "Post now": a draft or pending-review item is approved in the same call,
/// then scheduled for immediate publication.
pub async fn publish_now(
    deps: &ServerDeps,
    tenant_id: Uuid,
    content_id: Uuid,
) -> Result<ScheduleEntry, ScheduleError> {
    let pool = deps.pool();

    if Tenant::is_paused(tenant_id, pool).await.map_err(ScheduleError::Other)? {
        return Err(ScheduleError::TenantPaused);
    }

    let content = ContentItem::find(content_id, pool)
        .await
        .map_err(ScheduleError::Other)?
        .filter(|c| c.tenant_id == tenant_id)
        .ok_or(ScheduleError::ContentNotFound)?;

    match content.status_parsed().map_err(ScheduleError::Other)? {
        ContentStatus::Draft | ContentStatus::PendingReview => {
            ContentItem::approve(content_id, pool)
                .await
                .map_err(ScheduleError::Other)?;
        }
        ContentStatus::Approved => {}
        ContentStatus::Published => return Err(ScheduleError::AlreadyPublished),
    }

    schedule_content(deps, tenant_id, content_id, Utc::now()).await
}
