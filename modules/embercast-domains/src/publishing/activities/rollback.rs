//! Rollback / dedup resolver. The oldest successful attempt per content item
//! is authoritative; later ones get deleted from the platform and marked
//! rolled back.

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use embercast_core::{ErrorBody, ServerDeps};

use crate::publishing::models::{PlatformCredential, PublishAttempt};
use crate::publishing::outcome::parse_post_ref;

#[derive(Debug, Error)]
pub enum RollbackError {
    #[error("publish attempt not found")]
    NotFound,

    #[error("attempt was not a successful publish")]
    NotSuccessful,

    #[error("attempt is already rolled back")]
    AlreadyRolledBack,

    #[error("attempt has no platform post reference")]
    MissingPostRef,

    #[error("no usable credential for provider {0}")]
    MissingCredential(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RollbackError {
    pub fn code(&self) -> &'static str {
        match self {
            RollbackError::NotFound => "not_found",
            RollbackError::NotSuccessful => "not_successful",
            RollbackError::AlreadyRolledBack => "already_rolled_back",
            RollbackError::MissingPostRef => "missing_post_ref",
            RollbackError::MissingCredential(_) => "missing_credential",
            RollbackError::Other(_) => "internal",
        }
    }

    pub fn body(&self) -> ErrorBody {
        ErrorBody::new(self.code(), self.to_string())
    }
}

/// Per-item outcome of a bulk rollback.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackItem {
    pub attempt_id: Uuid,
    pub content_id: Uuid,
    pub post_ref: Option<String>,
    pub rolled_back: bool,
    pub error: Option<String>,
}

/// Roll back a single attempt: delete the platform post, then set the
/// rollback marker. Eligibility is checked first — an already-rolled-back or
/// failed attempt fails fast without touching the platform.
pub async fn rollback_attempt(deps: &ServerDeps, attempt_id: Uuid) -> Result<(), RollbackError> {
    let pool = deps.pool();

    let attempt = PublishAttempt::find(attempt_id, pool)
        .await
        .map_err(RollbackError::Other)?
        .ok_or(RollbackError::NotFound)?;

    if !attempt.success {
        return Err(RollbackError::NotSuccessful);
    }
    if attempt.rolled_back {
        return Err(RollbackError::AlreadyRolledBack);
    }

    let post_ref = attempt
        .post_ref
        .clone()
        .or_else(|| attempt.post_url.as_deref().and_then(parse_post_ref))
        .ok_or(RollbackError::MissingPostRef)?;

    let sealing_key = deps
        .config
        .credential_sealing_key
        .clone()
        .ok_or_else(|| RollbackError::MissingCredential(attempt.provider.clone()))?;
    let client = deps
        .platforms
        .get(&attempt.provider)
        .ok_or_else(|| RollbackError::MissingCredential(attempt.provider.clone()))?;
    let credential = PlatformCredential::get(attempt.tenant_id, &attempt.provider, &sealing_key, pool)
        .await
        .map_err(RollbackError::Other)?
        .ok_or_else(|| RollbackError::MissingCredential(attempt.provider.clone()))?;

    client
        .delete_post(&post_ref, &credential)
        .await
        .map_err(RollbackError::Other)?;

    let updated = PublishAttempt::mark_rolled_back(attempt_id, pool)
        .await
        .map_err(RollbackError::Other)?;
    if updated == 0 {
        // A concurrent rollback won after the eligibility check.
        return Err(RollbackError::AlreadyRolledBack);
    }

    info!(
        attempt_id = %attempt_id,
        content_id = %attempt.content_id,
        post_ref = %post_ref,
        "Duplicate publish rolled back"
    );
    Ok(())
}

/// Find all duplicate successful publishes for a tenant and roll back
/// everything but the oldest attempt in each group. Sequential; one failure
/// never aborts the batch — the report carries per-item outcomes.
pub async fn rollback_duplicates(
    deps: &ServerDeps,
    tenant_id: Uuid,
) -> Result<Vec<RollbackItem>, RollbackError> {
    let pool = deps.pool();
    let groups = PublishAttempt::duplicate_groups(tenant_id, pool)
        .await
        .map_err(RollbackError::Other)?;

    let mut report = Vec::new();
    for group in &groups {
        // group is ordered oldest first; the first attempt stays.
        for attempt in group.iter().skip(1) {
            let result = rollback_attempt(deps, attempt.id).await;
            if let Err(e) = &result {
                warn!(
                    attempt_id = %attempt.id,
                    content_id = %attempt.content_id,
                    error = %e,
                    "Rollback failed for duplicate attempt"
                );
            }
            report.push(RollbackItem {
                attempt_id: attempt.id,
                content_id: attempt.content_id,
                post_ref: attempt.post_ref.clone(),
                rolled_back: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
            });
        }
    }

    info!(
        tenant_id = %tenant_id,
        duplicate_groups = groups.len(),
        rolled_back = report.iter().filter(|r| r.rolled_back).count(),
        failed = report.iter().filter(|r| !r.rolled_back).count(),
        "Duplicate rollback complete"
    );
    Ok(report)
}
