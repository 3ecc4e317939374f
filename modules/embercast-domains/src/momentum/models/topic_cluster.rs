use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TopicCluster {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl TopicCluster {
    pub async fn create(tenant_id: Uuid, name: &str, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO topic_clusters (tenant_id, name) VALUES ($1, $2) RETURNING *",
        )
        .bind(tenant_id)
        .bind(name)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }

    /// The tenant's default cluster, created on first use. The partial unique
    /// index on (tenant_id) WHERE is_default resolves concurrent creators.
    pub async fn default_for_tenant(tenant_id: Uuid, pool: &PgPool) -> Result<Self> {
        let inserted = sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO topic_clusters (tenant_id, name, is_default)
            VALUES ($1, 'General', TRUE)
            ON CONFLICT (tenant_id) WHERE is_default DO NOTHING
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;

        match inserted {
            Some(cluster) => Ok(cluster),
            None => sqlx::query_as::<_, Self>(
                "SELECT * FROM topic_clusters WHERE tenant_id = $1 AND is_default",
            )
            .bind(tenant_id)
            .fetch_one(pool)
            .await
            .map_err(Into::into),
        }
    }

    pub async fn for_tenant(tenant_id: Uuid, pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM topic_clusters WHERE tenant_id = $1 ORDER BY created_at",
        )
        .bind(tenant_id)
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }
}
