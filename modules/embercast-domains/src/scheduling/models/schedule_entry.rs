use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use embercast_core::ScheduleStatus;

/// The unit of scheduling work: one publish intent and its lifecycle.
/// The partial unique index on (content_id) WHERE status = 'queued' is the
/// core concurrency invariant — concurrent schedulers race on the index,
/// never on application checks.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduleEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub content_id: Uuid,
    pub status: String,
    pub scheduled_for: DateTime<Utc>,
    pub idempotency_key: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScheduleEntry {
    pub fn status_parsed(&self) -> Result<ScheduleStatus> {
        self.status.parse()
    }

    /// Conditional insert. Returns `None` when another queued entry already
    /// exists for the content — the caller lost the race and should return
    /// the winner instead.
    pub async fn insert_queued(
        tenant_id: Uuid,
        content_id: Uuid,
        scheduled_for: DateTime<Utc>,
        idempotency_key: &str,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO schedule_entries (tenant_id, content_id, status, scheduled_for, idempotency_key)
            VALUES ($1, $2, 'queued', $3, $4)
            ON CONFLICT (content_id) WHERE status = 'queued' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(content_id)
        .bind(scheduled_for)
        .bind(idempotency_key)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM schedule_entries WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn active_for_content(content_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM schedule_entries WHERE content_id = $1 AND status = 'queued'",
        )
        .bind(content_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    /// Whether any other entry already published this content.
    pub async fn completed_exists_for_content(
        content_id: Uuid,
        excluding: Option<Uuid>,
        pool: &PgPool,
    ) -> Result<bool> {
        let row = sqlx::query_as::<_, (bool,)>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM schedule_entries
                WHERE content_id = $1
                  AND status = 'completed'
                  AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(content_id)
        .bind(excluding)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    pub async fn count_created_between(
        tenant_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>(
            r#"
            SELECT COUNT(*) FROM schedule_entries
            WHERE tenant_id = $1 AND created_at >= $2 AND created_at < $3
            "#,
        )
        .bind(tenant_id)
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Guarded transition to `completed`. A `failed` entry being re-executed
    /// by a queue retry may also complete; terminal states never move.
    pub async fn mark_completed(id: Uuid, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE schedule_entries SET
                status = 'completed',
                completed_at = now(),
                error_message = NULL,
                updated_at = now()
            WHERE id = $1 AND status IN ('queued', 'failed')
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_failed(id: Uuid, error: &str, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE schedule_entries SET
                status = 'failed',
                error_message = $2,
                updated_at = now()
            WHERE id = $1 AND status IN ('queued', 'failed')
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Cancellation is allowed only while still queued; in-flight work runs
    /// to completion and records its result regardless. Clears the content's
    /// schedule association so the item returns to the auto-schedulable pool.
    pub async fn cancel(id: Uuid, pool: &PgPool) -> Result<u64> {
        let mut tx = pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE schedule_entries SET status = 'cancelled', updated_at = now()
            WHERE id = $1 AND status = 'queued'
            "#,
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() > 0 {
            sqlx::query(
                r#"
                UPDATE content_items SET
                    schedule_entry_id = NULL,
                    scheduled_for = NULL,
                    updated_at = now()
                WHERE schedule_entry_id = $1
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Queued entries past their scheduled time by at least `grace_secs`,
    /// candidates for the requeue repair scan.
    pub async fn overdue_queued(grace_secs: i64, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM schedule_entries
            WHERE status = 'queued'
              AND scheduled_for < now() - make_interval(secs => $1)
            ORDER BY scheduled_for
            "#,
        )
        .bind(grace_secs as f64)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
