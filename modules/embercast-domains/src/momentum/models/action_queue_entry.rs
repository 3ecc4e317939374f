use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use embercast_core::ActionStatus;

use crate::momentum::models::MomentumSnapshot;

/// A topic flagged hot enough to deserve a human decision. Score components
/// are copied from the snapshot at insert time so the entry stays
/// interpretable after momentum moves on.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ActionQueueEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub topic_id: Uuid,
    pub status: String,
    pub hot_score: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub source_diversity: f64,
    pub freshness: f64,
    pub confidence: f64,
    pub computed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ActionQueueEntry {
    /// Conditional insert against the partial unique index on
    /// (tenant_id, topic_id) WHERE status = 'pending'. Returns `None` when a
    /// pending entry already exists — including one raced in by a concurrent
    /// momentum cycle.
    pub async fn insert_pending(
        snapshot: &MomentumSnapshot,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO action_queue_entries (
                tenant_id, topic_id, status, hot_score, velocity, acceleration,
                source_diversity, freshness, confidence, computed_at
            )
            VALUES ($1, $2, 'pending', $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (tenant_id, topic_id) WHERE status = 'pending' DO NOTHING
            RETURNING *
            "#,
        )
        .bind(snapshot.tenant_id)
        .bind(snapshot.topic_id)
        .bind(snapshot.hot_score)
        .bind(snapshot.velocity)
        .bind(snapshot.acceleration)
        .bind(snapshot.source_diversity)
        .bind(snapshot.freshness)
        .bind(snapshot.confidence)
        .bind(snapshot.computed_at)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn set_status(id: Uuid, status: ActionStatus, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE action_queue_entries SET status = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn pending_for_tenant(tenant_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            SELECT * FROM action_queue_entries
            WHERE tenant_id = $1 AND status = 'pending'
            ORDER BY hot_score DESC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
