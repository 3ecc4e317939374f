use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// (topic, source) correlation. Input to the confidence component only,
/// never authoritative state — losing these rows degrades confidence and
/// nothing else.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CorrelationEdge {
    pub topic_id: Uuid,
    pub source_ref: String,
    pub strength: f64,
    pub frequency: i64,
    pub last_seen: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl CorrelationEdge {
    /// Fold one window's observation into the edge. Strength is an equal-parts
    /// blend of the stored value and this window's share, clamped to [0,1];
    /// frequency accumulates; last_seen only moves forward.
    pub async fn upsert_observation(
        topic_id: Uuid,
        source_ref: &str,
        window_share: f64,
        occurrences: i64,
        last_seen: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO correlation_edges (topic_id, source_ref, strength, frequency, last_seen, updated_at)
            VALUES ($1, $2, LEAST(1.0, GREATEST(0.0, $3)), $4, $5, now())
            ON CONFLICT (topic_id, source_ref) DO UPDATE SET
                strength = LEAST(1.0, GREATEST(0.0, correlation_edges.strength * 0.5 + $3 * 0.5)),
                frequency = correlation_edges.frequency + $4,
                last_seen = GREATEST(correlation_edges.last_seen, $5),
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(topic_id)
        .bind(source_ref)
        .bind(window_share)
        .bind(occurrences)
        .bind(last_seen)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn mean_strength(topic_id: Uuid, pool: &PgPool) -> Result<Option<f64>> {
        let row = sqlx::query_as::<_, (Option<f64>,)>(
            "SELECT AVG(strength) FROM correlation_edges WHERE topic_id = $1",
        )
        .bind(topic_id)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    pub async fn for_topic(topic_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM correlation_edges WHERE topic_id = $1 ORDER BY source_ref",
        )
        .bind(topic_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
