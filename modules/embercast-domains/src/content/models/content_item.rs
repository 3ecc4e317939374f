use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use embercast_core::ContentStatus;

/// A content item moving through the editorial lifecycle. This core only
/// transitions status and the schedule association; authoring lives in the
/// generation service.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ContentItem {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub topic_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub status: String,
    pub approved_at: Option<DateTime<Utc>>,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub schedule_entry_id: Option<Uuid>,
    pub publish_failed_at: Option<DateTime<Utc>>,
    pub publish_failed_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn status_parsed(&self) -> Result<ContentStatus> {
        self.status.parse()
    }

    pub async fn find(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM content_items WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn create(
        tenant_id: Uuid,
        topic_id: Option<Uuid>,
        title: &str,
        body: &str,
        status: ContentStatus,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO content_items (tenant_id, topic_id, title, body, status, approved_at)
            VALUES ($1, $2, $3, $4, $5, CASE WHEN $5 = 'approved' THEN now() END)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(topic_id)
        .bind(title)
        .bind(body)
        .bind(status.as_str())
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// Approve a draft or pending-review item. Clears any prior permanent
    /// publish failure so the item re-enters auto-scheduling.
    pub async fn approve(id: Uuid, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE content_items SET
                status = 'approved',
                approved_at = now(),
                publish_failed_at = NULL,
                publish_failed_reason = NULL,
                updated_at = now()
            WHERE id = $1 AND status IN ('draft', 'pending_review')
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn set_schedule(
        id: Uuid,
        entry_id: Uuid,
        scheduled_for: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE content_items SET
                schedule_entry_id = $2,
                scheduled_for = $3,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(entry_id)
        .bind(scheduled_for)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_published(id: Uuid, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE content_items SET status = 'published', updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Permanent publish failure: back to human review, schedule association
    /// cleared, failure recorded so auto-scheduling skips it until
    /// re-approved.
    pub async fn revert_to_review(id: Uuid, reason: &str, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE content_items SET
                status = 'pending_review',
                schedule_entry_id = NULL,
                publish_failed_at = now(),
                publish_failed_reason = $2,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(reason)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Oldest approved item with no active schedule entry and no prior
    /// permanent publish failure — the auto-scheduler's pick.
    pub async fn next_auto_schedulable(tenant_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM content_items
            WHERE tenant_id = $1
              AND status = 'approved'
              AND schedule_entry_id IS NULL
              AND publish_failed_at IS NULL
            ORDER BY approved_at NULLS LAST, created_at
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }
}
