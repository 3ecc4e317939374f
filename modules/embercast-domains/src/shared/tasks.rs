//! Postgres-backed work queue shared with sibling services.
//!
//! Claiming uses `FOR UPDATE SKIP LOCKED` plus a lease (`locked_until`) so a
//! task held by a crashed worker redelivers once the lease expires. Completion
//! deletes the row; transient retries clear the lease and push `run_at` out by
//! an exponential backoff with jitter.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

pub const KIND_PUBLISH: &str = "publish";
pub const KIND_MOMENTUM: &str = "momentum";

/// How long a claimed task stays invisible to other workers.
pub const LEASE_SECS: i64 = 300;

const BACKOFF_BASE_SECS: i64 = 30;
const BACKOFF_CAP_SECS: i64 = 900;

/// Wire payload of one queue task. Field names are camelCase — this is the
/// contract with the sibling services that share the `tasks` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum TaskPayload {
    #[serde(rename = "publish", rename_all = "camelCase")]
    Publish {
        schedule_entry_id: Uuid,
        approved_content_id: Uuid,
        tenant_id: Uuid,
    },
    #[serde(rename = "momentum", rename_all = "camelCase")]
    Momentum { tenant_id: Uuid },
}

impl TaskPayload {
    pub fn kind(&self) -> &'static str {
        match self {
            TaskPayload::Publish { .. } => KIND_PUBLISH,
            TaskPayload::Momentum { .. } => KIND_MOMENTUM,
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Task {
    pub id: i64,
    pub kind: String,
    pub payload: serde_json::Value,
    pub run_at: DateTime<Utc>,
    pub attempts: i32,
    pub max_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub locked_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub async fn enqueue(
        payload: &TaskPayload,
        run_at: DateTime<Utc>,
        max_attempts: i32,
        pool: &PgPool,
    ) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            INSERT INTO tasks (kind, payload, run_at, max_attempts)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(payload.kind())
        .bind(serde_json::to_value(payload)?)
        .bind(run_at)
        .bind(max_attempts)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Claim the next due task of one of the given kinds. The claim bumps
    /// `attempts` and sets the lease in the same statement, so a crash after
    /// this point still counts as an attempt.
    pub async fn claim(kinds: &[&str], worker_id: &str, pool: &PgPool) -> Result<Option<Self>> {
        let kinds: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
        sqlx::query_as::<_, Self>(
            r#"
            UPDATE tasks SET
                locked_until = now() + make_interval(secs => $3),
                locked_by = $2,
                attempts = attempts + 1
            FROM (
                SELECT id FROM tasks
                WHERE kind = ANY($1)
                  AND run_at <= now()
                  AND (locked_until IS NULL OR locked_until < now())
                ORDER BY run_at
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            ) due
            WHERE tasks.id = due.id
            RETURNING tasks.*
            "#,
        )
        .bind(&kinds)
        .bind(worker_id)
        .bind(LEASE_SECS as f64)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn complete(id: i64, pool: &PgPool) -> Result<()> {
        sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Release the task for a later retry, or dead-letter it once attempts
    /// are exhausted. Dead-lettering deletes the row with a warning — the
    /// durable audit for publish work lives in `publish_attempts`.
    pub async fn retry_later(&self, pool: &PgPool) -> Result<()> {
        if self.attempts >= self.max_attempts {
            warn!(
                task_id = self.id,
                kind = %self.kind,
                attempts = self.attempts,
                "Task exhausted retry budget, dead-lettering"
            );
            return Self::complete(self.id, pool).await;
        }

        let delay = backoff_delay(self.attempts);
        sqlx::query(
            r#"
            UPDATE tasks SET
                run_at = now() + make_interval(secs => $2),
                locked_until = NULL,
                locked_by = NULL
            WHERE id = $1
            "#,
        )
        .bind(self.id)
        .bind(delay.num_milliseconds() as f64 / 1000.0)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub fn decode(&self) -> Result<TaskPayload> {
        serde_json::from_value(self.payload.clone()).map_err(Into::into)
    }

    /// Whether a live (not yet dead-lettered) publish task exists for the
    /// given schedule entry. Used by the requeue scan to avoid duplicates.
    pub async fn publish_task_exists(entry_id: Uuid, pool: &PgPool) -> Result<bool> {
        let row = sqlx::query_as::<_, (bool,)>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tasks
                WHERE kind = $1 AND payload->>'scheduleEntryId' = $2
            )
            "#,
        )
        .bind(KIND_PUBLISH)
        .bind(entry_id.to_string())
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Whether a momentum task for the tenant is already waiting or running.
    pub async fn momentum_task_exists(tenant_id: Uuid, pool: &PgPool) -> Result<bool> {
        let row = sqlx::query_as::<_, (bool,)>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM tasks
                WHERE kind = $1 AND payload->>'tenantId' = $2
            )
            "#,
        )
        .bind(KIND_MOMENTUM)
        .bind(tenant_id.to_string())
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }
}

/// Exponential backoff for the nth retry (attempt counts from 1):
/// 30s · 2^(n−1), capped at 15 minutes, with ±20% jitter.
pub fn backoff_delay(attempt: i32) -> Duration {
    let exp = (attempt - 1).clamp(0, 30) as u32;
    let base = BACKOFF_BASE_SECS
        .saturating_mul(2i64.saturating_pow(exp))
        .min(BACKOFF_CAP_SECS);
    let jitter = rand::rng().random_range(0.8..=1.2);
    Duration::milliseconds((base as f64 * 1000.0 * jitter) as i64)
}
