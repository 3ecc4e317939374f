use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Per-tenant auto-posting configuration. Written by the settings surface,
/// read-only to the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AutoScheduleSettings {
    pub tenant_id: Uuid,
    pub enabled: bool,
    pub posts_per_day: i32,
    /// Zero-padded local `HH:MM` strings.
    pub preferred_times: Vec<String>,
    /// IANA timezone name.
    pub timezone: String,
    /// 0 = Sunday … 6 = Saturday.
    pub days_of_week: Vec<i16>,
    pub updated_at: DateTime<Utc>,
}

impl AutoScheduleSettings {
    pub async fn enabled(pool: &PgPool) -> Result<Vec<Self>> {
        sqlx::query_as::<_, Self>(
            "SELECT * FROM auto_schedule_settings WHERE enabled ORDER BY tenant_id",
        )
        .fetch_all(pool)
        .await
        .map_err(Into::into)
    }

    pub async fn upsert(
        tenant_id: Uuid,
        enabled: bool,
        posts_per_day: i32,
        preferred_times: &[String],
        timezone: &str,
        days_of_week: &[i16],
        pool: &PgPool,
    ) -> Result<Self> {
        sqlx::query_as::<_, Self>(
            r#"
            INSERT INTO auto_schedule_settings
                (tenant_id, enabled, posts_per_day, preferred_times, timezone, days_of_week)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (tenant_id) DO UPDATE SET
                enabled = EXCLUDED.enabled,
                posts_per_day = EXCLUDED.posts_per_day,
                preferred_times = EXCLUDED.preferred_times,
                timezone = EXCLUDED.timezone,
                days_of_week = EXCLUDED.days_of_week,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(enabled)
        .bind(posts_per_day)
        .bind(preferred_times)
        .bind(timezone)
        .bind(days_of_week)
        .fetch_one(pool)
        .await
        .map_err(Into::into)
    }
}
