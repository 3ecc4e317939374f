use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::momentum::score::MomentumComponents;

/// One row per topic, overwritten each cycle — current state, not history.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MomentumSnapshot {
    pub topic_id: Uuid,
    pub tenant_id: Uuid,
    pub hot_score: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub source_diversity: f64,
    pub freshness: f64,
    pub confidence: f64,
    pub current_count: i64,
    pub previous_count: i64,
    pub computed_at: DateTime<Utc>,
}

impl MomentumSnapshot {
    pub async fn upsert(
        topic_id: Uuid,
        tenant_id: Uuid,
        components: &MomentumComponents,
        current_count: i64,
        previous_count: i64,
        computed_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO momentum_snapshots (
                topic_id, tenant_id, hot_score, velocity, acceleration,
                source_diversity, freshness, confidence,
                current_count, previous_count, computed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (topic_id) DO UPDATE SET
                hot_score = EXCLUDED.hot_score,
                velocity = EXCLUDED.velocity,
                acceleration = EXCLUDED.acceleration,
                source_diversity = EXCLUDED.source_diversity,
                freshness = EXCLUDED.freshness,
                confidence = EXCLUDED.confidence,
                current_count = EXCLUDED.current_count,
                previous_count = EXCLUDED.previous_count,
                computed_at = EXCLUDED.computed_at
            RETURNING *
            "#,
        )
        .bind(topic_id)
        .bind(tenant_id)
        .bind(components.hot_score)
        .bind(components.velocity)
        .bind(components.acceleration)
        .bind(components.source_diversity)
        .bind(components.freshness)
        .bind(components.confidence)
        .bind(current_count)
        .bind(previous_count)
        .bind(computed_at)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn find(topic_id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>("SELECT * FROM momentum_snapshots WHERE topic_id = $1")
            .bind(topic_id)
            .fetch_optional(pool)
            .await
            .map_err(Into::into)
    }

}
