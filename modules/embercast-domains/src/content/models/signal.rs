use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

/// One ingested external item. Written by the ingestion service; this core
/// reads them for momentum scoring and only ever mutates `topic_id`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Signal {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub topic_id: Option<Uuid>,
    pub url: String,
    pub title: String,
    pub source_ref: String,
    pub content_hash: String,
    pub confidence: f64,
    pub observed_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Aggregates the momentum scorer reads for one topic window.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WindowStats {
    pub signal_count: i64,
    pub unique_sources: i64,
    pub avg_confidence: Option<f64>,
    pub latest_observed_at: Option<DateTime<Utc>>,
}

/// Per-source occurrence counts within a window, for correlation edges.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SourceWindowCount {
    pub source_ref: String,
    pub occurrences: i64,
    pub last_seen: DateTime<Utc>,
}

impl Signal {
    /// Deduplicating insert. Returns `None` when the hash already exists.
    pub async fn create(
        tenant_id: Uuid,
        url: &str,
        title: &str,
        source_ref: &str,
        confidence: f64,
        observed_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Option<Self>> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO signals (tenant_id, url, title, source_ref, content_hash, confidence, observed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (tenant_id, content_hash) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(url)
        .bind(title)
        .bind(source_ref)
        .bind(Self::content_hash(url, title))
        .bind(confidence)
        .bind(observed_at)
        .fetch_optional(pool)
        .await
        .map_err(Into::into)
    }

    pub fn content_hash(url: &str, title: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_bytes());
        hasher.update(b"\n");
        hasher.update(title.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Assign every unclustered signal of the tenant to the given topic.
    pub async fn assign_unclustered(
        tenant_id: Uuid,
        topic_id: Uuid,
        pool: &PgPool,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE signals SET topic_id = $2 WHERE tenant_id = $1 AND topic_id IS NULL",
        )
        .bind(tenant_id)
        .bind(topic_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn window_stats(
        topic_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<WindowStats> {
        sqlx::query_as::<_, WindowStats>(
            r#"
            SELECT
                COUNT(*) AS signal_count,
                COUNT(DISTINCT source_ref) AS unique_sources,
                AVG(confidence) AS avg_confidence,
                MAX(observed_at) AS latest_observed_at
            FROM signals
            WHERE topic_id = $1 AND observed_at >= $2 AND observed_at < $3
            "#,
        )
        .bind(topic_id)
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn count_in_window(
        topic_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<i64> {
        let row = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM signals WHERE topic_id = $1 AND observed_at >= $2 AND observed_at < $3",
        )
        .bind(topic_id)
        .bind(from)
        .bind(to)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    pub async fn source_counts_in_window(
        topic_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Vec<SourceWindowCount>> {
        sqlx::query_as::<_, SourceWindowCount>(
            r#"
            SELECT source_ref, COUNT(*) AS occurrences, MAX(observed_at) AS last_seen
            FROM signals
            WHERE topic_id = $1 AND observed_at >= $2 AND observed_at < $3
            GROUP BY source_ref
            "#,
        )
        .bind(topic_id)
        .bind(from)
        .bind(to)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
