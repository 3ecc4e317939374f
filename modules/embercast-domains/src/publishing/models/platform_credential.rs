//! Platform credentials, sealed at rest with pgcrypto. The sealing key only
//! ever travels as a bound parameter; a missing key is a configuration
//! failure surfaced before any query runs.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use embercast_core::{Credential, RefreshedTokens};

#[derive(Debug, sqlx::FromRow)]
struct UnsealedRow {
    provider: String,
    access_token: String,
    refresh_token: Option<String>,
    author_ref: String,
    expires_at: Option<DateTime<Utc>>,
}

pub struct PlatformCredential;

impl PlatformCredential {
    /// Which provider this tenant publishes through, if any credential is on
    /// file. Does not need the sealing key.
    pub async fn first_provider(tenant_id: Uuid, pool: &PgPool) -> Result<Option<String>> {
        let row = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT provider FROM platform_credentials
            WHERE tenant_id = $1
            ORDER BY created_at
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;
        Ok(row.map(|(p,)| p))
    }

    pub async fn get(
        tenant_id: Uuid,
        provider: &str,
        sealing_key: &str,
        pool: &PgPool,
    ) -> Result<Option<Credential>> {
        let row = sqlx::query_as::<_, UnsealedRow>(
            r#"
            SELECT
                provider,
                pgp_sym_decrypt(access_token_sealed, $3) AS access_token,
                pgp_sym_decrypt(refresh_token_sealed, $3) AS refresh_token,
                author_ref,
                expires_at
            FROM platform_credentials
            WHERE tenant_id = $1 AND provider = $2
            "#,
        )
        .bind(tenant_id)
        .bind(provider)
        .bind(sealing_key)
        .fetch_optional(pool)
        .await?;

        Ok(row.map(|r| Credential {
            provider: r.provider,
            access_token: r.access_token,
            refresh_token: r.refresh_token,
            expires_at: r.expires_at,
            author_ref: r.author_ref,
        }))
    }

    pub async fn save(
        tenant_id: Uuid,
        provider: &str,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_at: Option<DateTime<Utc>>,
        author_ref: &str,
        sealing_key: &str,
        pool: &PgPool,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO platform_credentials
                (tenant_id, provider, access_token_sealed, refresh_token_sealed, author_ref, expires_at)
            VALUES ($1, $2, pgp_sym_encrypt($3, $7), pgp_sym_encrypt($4, $7), $5, $6)
            ON CONFLICT (tenant_id, provider) DO UPDATE SET
                access_token_sealed = EXCLUDED.access_token_sealed,
                refresh_token_sealed = COALESCE(EXCLUDED.refresh_token_sealed, platform_credentials.refresh_token_sealed),
                author_ref = EXCLUDED.author_ref,
                expires_at = EXCLUDED.expires_at,
                updated_at = now()
            "#,
        )
        .bind(tenant_id)
        .bind(provider)
        .bind(access_token)
        .bind(refresh_token)
        .bind(author_ref)
        .bind(expires_at)
        .bind(sealing_key)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Persist refreshed tokens. Single-row atomic overwrite; a lost update
    /// between two concurrent refreshes leaves an equally valid token.
    pub async fn update_tokens(
        tenant_id: Uuid,
        provider: &str,
        tokens: &RefreshedTokens,
        sealing_key: &str,
        pool: &PgPool,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE platform_credentials SET
                access_token_sealed = pgp_sym_encrypt($3, $5),
                refresh_token_sealed = COALESCE(pgp_sym_encrypt($4, $5), refresh_token_sealed),
                expires_at = $6,
                updated_at = now()
            WHERE tenant_id = $1 AND provider = $2
            "#,
        )
        .bind(tenant_id)
        .bind(provider)
        .bind(&tokens.access_token)
        .bind(&tokens.refresh_token)
        .bind(sealing_key)
        .bind(tokens.expires_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
