use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use embercast_core::PlatformResponse;

/// Append-only audit of one execution of a schedule entry. Rows are never
/// mutated except to set the rollback fields.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PublishAttempt {
    pub id: Uuid,
    pub schedule_entry_id: Uuid,
    pub content_id: Uuid,
    pub tenant_id: Uuid,
    pub provider: String,
    pub success: bool,
    pub response_status: Option<i32>,
    pub response_body: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub post_ref: Option<String>,
    pub post_url: Option<String>,
    pub rolled_back: bool,
    pub rolled_back_at: Option<DateTime<Utc>>,
    pub attempted_at: DateTime<Utc>,
}

impl PublishAttempt {
    pub async fn record(
        schedule_entry_id: Uuid,
        content_id: Uuid,
        tenant_id: Uuid,
        provider: &str,
        resp: &PlatformResponse,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO publish_attempts (
                schedule_entry_id, content_id, tenant_id, provider, success,
                response_status, response_body, error_message, post_ref, post_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(schedule_entry_id)
        .bind(content_id)
        .bind(tenant_id)
        .bind(provider)
        .bind(resp.success)
        .bind(resp.status.map(|s| s as i32))
        .bind(&resp.body)
        .bind(&resp.error)
        .bind(&resp.post_ref)
        .bind(&resp.post_url)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM publish_attempts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn count_for_entry(schedule_entry_id: Uuid, pool: &PgPool) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM publish_attempts WHERE schedule_entry_id = $1",
        )
        .bind(schedule_entry_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Successful, not-yet-rolled-back attempts grouped by content, each
    /// group ordered oldest first. Groups with more than one member are
    /// duplicate publishes.
    pub async fn duplicate_groups(tenant_id: Uuid, pool: &PgPool) -> Result<Vec<Vec<Self>>> {
        let rows = sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM publish_attempts
            WHERE tenant_id = $1 AND success AND NOT rolled_back
            ORDER BY content_id, attempted_at, id
            "#,
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;

        let mut groups: BTreeMap<Uuid, Vec<Self>> = BTreeMap::new();
        for row in rows {
            groups.entry(row.content_id).or_default().push(row);
        }
        Ok(groups.into_values().filter(|g| g.len() > 1).collect())
    }

    /// Conditional rollback marker: only a successful, not-yet-rolled-back
    /// attempt flips. Zero rows means the attempt was ineligible (or a
    /// concurrent rollback won).
    pub async fn mark_rolled_back(id: Uuid, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE publish_attempts SET rolled_back = TRUE, rolled_back_at = now()
            WHERE id = $1 AND success AND NOT rolled_back
            "#,
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
