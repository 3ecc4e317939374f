use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub paused: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Kill-switch check. An unknown tenant id reads as paused — fail closed.
    pub async fn is_paused(id: Uuid, pool: &PgPool) -> Result<bool> {
        let row = sqlx::query_as::<_, (bool,)>("SELECT paused FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
        Ok(row.map(|(paused,)| paused).unwrap_or(true))
    }

    pub async fn active_ids(pool: &PgPool) -> Result<Vec<Uuid>> {
        let rows = sqlx::query_as::<_, (Uuid,)>(
            "SELECT id FROM tenants WHERE NOT paused ORDER BY created_at",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    pub async fn create(name: &str, paused: bool, pool: &PgPool) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO tenants (name, paused) VALUES ($1, $2) RETURNING *",
        )
        .bind(name)
        .bind(paused)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}
