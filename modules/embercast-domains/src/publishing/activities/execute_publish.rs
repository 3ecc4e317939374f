//! Publish Executor: runs one publish task end to end. Replay-proof — a
//! redelivered or duplicate task against already-published content performs
//! zero platform calls.

use anyhow::Result;
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use embercast_core::{PlatformResponse, ScheduleStatus, ServerDeps};

use crate::content::models::ContentItem;
use crate::publishing::models::{PlatformCredential, PublishAttempt};
use crate::publishing::outcome::{classify_response, render_post, FailureKind};
use crate::scheduling::models::ScheduleEntry;

/// Result of one execution. The worker maps `Failed(Transient)` to a queue
/// retry; everything else completes the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishOutcome {
    /// Platform accepted the post.
    Published,
    /// Another entry already published this content; completed without a
    /// platform call.
    AlreadyPublished,
    /// Entry was cancelled or completed before execution; nothing to do.
    Stale,
    Failed(FailureKind),
}

pub async fn execute_publish(
    deps: &ServerDeps,
    entry_id: Uuid,
    content_id: Uuid,
    tenant_id: Uuid,
) -> Result<PublishOutcome> {
    let pool = deps.pool();

    // Step 1: the entry must still be executable. A failed entry redelivered
    // by queue retry runs again; terminal states no-op.
    let Some(entry) = ScheduleEntry::find(entry_id, pool).await? else {
        warn!(entry_id = %entry_id, "Publish task references missing schedule entry");
        return Ok(PublishOutcome::Stale);
    };
    match entry.status_parsed()? {
        ScheduleStatus::Queued | ScheduleStatus::Failed => {}
        ScheduleStatus::Cancelled | ScheduleStatus::Completed => {
            return Ok(PublishOutcome::Stale);
        }
    }

    // Step 2: a parallel attempt may have already published this content.
    if ScheduleEntry::completed_exists_for_content(content_id, Some(entry_id), pool).await? {
        ScheduleEntry::mark_completed(entry_id, pool).await?;
        info!(
            entry_id = %entry_id,
            content_id = %content_id,
            "Content already published by another entry, completing without platform call"
        );
        return Ok(PublishOutcome::AlreadyPublished);
    }

    // Step 3: credentials. Missing sealing key, credential, or adapter is an
    // operator problem — record, fail the entry, never revert the content.
    let Some(sealing_key) = deps.config.credential_sealing_key.clone() else {
        return config_failure(deps, &entry, "credential sealing key not configured").await;
    };
    let Some(provider) = PlatformCredential::first_provider(tenant_id, pool).await? else {
        return config_failure(deps, &entry, "no platform credential on file for tenant").await;
    };
    let Some(client) = deps.platforms.get(&provider) else {
        return config_failure(
            deps,
            &entry,
            &format!("no platform client registered for provider {provider}"),
        )
        .await;
    };
    let Some(mut credential) =
        PlatformCredential::get(tenant_id, &provider, &sealing_key, pool).await?
    else {
        return config_failure(deps, &entry, "platform credential row disappeared").await;
    };

    if credential.needs_refresh(Utc::now()) {
        match client.refresh_credential(&credential).await {
            Ok(tokens) => {
                PlatformCredential::update_tokens(tenant_id, &provider, &tokens, &sealing_key, pool)
                    .await?;
                credential.access_token = tokens.access_token;
                credential.expires_at = tokens.expires_at;
                if tokens.refresh_token.is_some() {
                    credential.refresh_token = tokens.refresh_token;
                }
            }
            Err(e) => {
                // Refresh goes over the network; treat like any transient
                // platform failure and let the queue back off.
                let msg = format!("credential refresh failed: {e}");
                warn!(entry_id = %entry.id, tenant_id = %tenant_id, error = %e, "Credential refresh failed");
                record_failure(deps, &entry, &provider, &msg).await?;
                ScheduleEntry::mark_failed(entry.id, &msg, pool).await?;
                return Ok(PublishOutcome::Failed(FailureKind::Transient));
            }
        }
    }

    // Step 4: render and submit.
    let Some(content) = ContentItem::find(content_id, pool).await? else {
        let msg = "content item no longer exists";
        record_failure(deps, &entry, &provider, msg).await?;
        ScheduleEntry::mark_failed(entry.id, msg, pool).await?;
        return Ok(PublishOutcome::Failed(FailureKind::Permanent));
    };
    let rendered = render_post(&content);
    let resp = client.publish(&rendered, &credential).await;

    // Step 5: the attempt is written immediately upon response — the window
    // between platform success and this insert is the one unavoidable risk.
    PublishAttempt::record(entry.id, content_id, tenant_id, &provider, &resp, pool).await?;

    // Steps 6–7: terminal entry state plus the failure policy.
    match classify_response(&resp) {
        None => {
            ScheduleEntry::mark_completed(entry.id, pool).await?;
            ContentItem::mark_published(content_id, pool).await?;
            info!(
                entry_id = %entry.id,
                content_id = %content_id,
                post_ref = resp.post_ref.as_deref().unwrap_or(""),
                "Content published"
            );
            Ok(PublishOutcome::Published)
        }
        Some(FailureKind::Transient) => {
            let msg = resp.error.clone().unwrap_or_else(|| "transient publish failure".to_string());
            ScheduleEntry::mark_failed(entry.id, &msg, pool).await?;
            warn!(entry_id = %entry.id, error = %msg, "Transient publish failure, queue will retry");
            Ok(PublishOutcome::Failed(FailureKind::Transient))
        }
        Some(FailureKind::Configuration) => {
            // Rejected credential (401/403): operator problem, the content
            // stays approved.
            let msg = resp.error.clone().unwrap_or_else(|| "platform rejected credential".to_string());
            ScheduleEntry::mark_failed(entry.id, &msg, pool).await?;
            warn!(
                entry_id = %entry.id,
                tenant_id = %tenant_id,
                error = %msg,
                "Publish rejected for credential reasons"
            );
            Ok(PublishOutcome::Failed(FailureKind::Configuration))
        }
        Some(FailureKind::Permanent) => {
            let msg = resp.error.clone().unwrap_or_else(|| "platform rejected content".to_string());
            ScheduleEntry::mark_failed(entry.id, &msg, pool).await?;
            ContentItem::revert_to_review(content_id, &msg, pool).await?;
            warn!(
                entry_id = %entry.id,
                content_id = %content_id,
                error = %msg,
                "Permanent publish failure, content reverted to review"
            );
            Ok(PublishOutcome::Failed(FailureKind::Permanent))
        }
    }
}

async fn config_failure(
    deps: &ServerDeps,
    entry: &ScheduleEntry,
    message: &str,
) -> Result<PublishOutcome> {
    warn!(entry_id = %entry.id, tenant_id = %entry.tenant_id, message, "Publish configuration failure");
    record_failure(deps, entry, "unknown", message).await?;
    ScheduleEntry::mark_failed(entry.id, message, deps.pool()).await?;
    Ok(PublishOutcome::Failed(FailureKind::Configuration))
}

async fn record_failure(
    deps: &ServerDeps,
    entry: &ScheduleEntry,
    provider: &str,
    message: &str,
) -> Result<()> {
    let resp = PlatformResponse {
        success: false,
        error: Some(message.to_string()),
        ..Default::default()
    };
    PublishAttempt::record(
        entry.id,
        entry.content_id,
        entry.tenant_id,
        provider,
        &resp,
        deps.pool(),
    )
    .await?;
    Ok(())
}
